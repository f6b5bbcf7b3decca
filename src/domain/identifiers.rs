//! Human-facing identifiers for assets
//!
//! Candidates are random; uniqueness is settled by [`generate_unique`], which keeps
//! drawing until the caller's lookup reports the value as unused.

use rand::Rng;
use std::future::Future;

use super::DomainError;

/// Give up after this many collisions
pub const MAX_ATTEMPTS: usize = 200;

fn code_prefix(category_code: Option<&str>, fallback: &str) -> String {
    let prefix: String = category_code
        .unwrap_or_default()
        .trim()
        .chars()
        .take(3)
        .collect::<String>()
        .to_uppercase();
    if prefix.is_empty() {
        fallback.to_string()
    } else {
        prefix
    }
}

/// `LAP4821` style: first three letters of the category code (or `PRD`) and four digits
pub fn internal_id_candidate<R: Rng + ?Sized>(category_code: Option<&str>, rng: &mut R) -> String {
    format!(
        "{}{:04}",
        code_prefix(category_code, "PRD"),
        rng.gen_range(0..10_000)
    )
}

/// `2025LAP0042` style: year, category prefix (or `GEN`) and four digits
pub fn serial_candidate<R: Rng + ?Sized>(
    category_code: Option<&str>,
    year: i32,
    rng: &mut R,
) -> String {
    format!(
        "{}{}{:04}",
        year,
        code_prefix(category_code, "GEN"),
        rng.gen_range(0..10_000)
    )
}

/// Sequential identifier for a product-type counter value
pub fn sequential_serial(prefix: &str, n: i32) -> String {
    format!("{}{:04}", prefix, n)
}

/// Draw candidates until `exists` reports one as free.
///
/// `candidate` is called synchronously before each lookup so a thread-local RNG
/// never lives across an await point.
pub async fn generate_unique<C, E, Fut>(
    mut candidate: C,
    mut exists: E,
) -> Result<String, DomainError>
where
    C: FnMut() -> String,
    E: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, DomainError>>,
{
    for _ in 0..MAX_ATTEMPTS {
        let value = candidate();
        if !exists(value.clone()).await? {
            return Ok(value);
        }
    }

    tracing::error!(attempts = MAX_ATTEMPTS, "identifier space exhausted");
    Err(DomainError::Internal(
        "Could not generate a unique identifier".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn internal_id_uses_category_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = internal_id_candidate(Some("lap-01"), &mut rng);
        assert!(id.starts_with("LAP"));
        assert_eq!(id.len(), 7);
        assert!(id[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn missing_category_code_falls_back() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(internal_id_candidate(None, &mut rng).starts_with("PRD"));
        assert!(internal_id_candidate(Some("  "), &mut rng).starts_with("PRD"));
        assert!(serial_candidate(None, 2024, &mut rng).starts_with("2024GEN"));
    }

    #[test]
    fn short_codes_are_kept_whole() {
        let mut rng = StdRng::seed_from_u64(1);
        let serial = serial_candidate(Some("tv"), 2023, &mut rng);
        assert!(serial.starts_with("2023TV"));
        assert_eq!(serial.len(), 4 + 2 + 4);
    }

    #[test]
    fn sequential_serial_pads() {
        assert_eq!(sequential_serial("MON", 7), "MON0007");
        assert_eq!(sequential_serial("MON", 12345), "MON12345");
    }

    #[tokio::test]
    async fn generate_unique_skips_taken_values() {
        let taken: HashSet<String> = ["A1", "A2"].iter().map(|s| s.to_string()).collect();
        let mut seq = vec!["A1", "A2", "A3"].into_iter();

        let value = generate_unique(
            || seq.next().unwrap_or("Z").to_string(),
            |v| {
                let hit = taken.contains(&v);
                async move { Ok(hit) }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, "A3");
    }

    #[tokio::test]
    async fn generate_unique_is_bounded() {
        let mut calls = 0;
        let result = generate_unique(
            || {
                calls += 1;
                "SAME".to_string()
            },
            |_| async { Ok(true) },
        )
        .await;

        assert!(matches!(result, Err(DomainError::Internal(_))));
        assert_eq!(calls, MAX_ATTEMPTS);
    }
}
