//! Code 128 (character set B) module sequence, quiet zones included.

use barcoders::sym::code128::Code128;

use super::RenderError;

pub const QUIET_ZONE: usize = 10;

/// Selects character set B in `barcoders` input
const SET_B: char = 'Ɓ';

/// Encode `text` as one `bool` per module (`true` = bar)
pub fn encode(text: &str) -> Result<Vec<bool>, RenderError> {
    if text.is_empty() {
        return Err(RenderError::EmptyPayload);
    }
    if let Some(c) = text.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(RenderError::UnsupportedChar(c));
    }

    let symbol = Code128::new(format!("{SET_B}{text}"))
        .map_err(|e| RenderError::Image(format!("code128: {e}")))?;

    let mut modules = vec![false; QUIET_ZONE];
    modules.extend(symbol.encode().into_iter().map(|bit| bit == 1));
    modules.extend(std::iter::repeat(false).take(QUIET_ZONE));
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(modules: &[bool]) -> String {
        modules.iter().map(|m| if *m { '1' } else { '0' }).collect()
    }

    #[test]
    fn starts_with_set_b_and_ends_with_stop() {
        let modules = encode("PJJ123C").unwrap();
        let symbol = &modules[QUIET_ZONE..modules.len() - QUIET_ZONE];
        assert_eq!(bits(&symbol[..11]), "11010010000");
        assert_eq!(bits(&symbol[symbol.len() - 13..]), "1100011101011");
    }

    #[test]
    fn module_count() {
        let text = "2024LAP0001";
        let modules = encode(text).unwrap();
        let symbols = text.len() + 2;
        assert_eq!(modules.len(), 2 * QUIET_ZONE + symbols * 11 + 13);
        assert!(modules[QUIET_ZONE]);
        assert!(!modules[modules.len() - 1]);
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(matches!(encode("Almacén"), Err(RenderError::UnsupportedChar('é'))));
        assert!(matches!(encode(""), Err(RenderError::EmptyPayload)));
    }
}
