//! Seed the promotion catalog from a YAML file.
//!
//! The file is parsed and validated before the database is touched, so a
//! broken file never leaves a half-seeded catalog behind.
//!
//! ```yaml
//! promotions:
//!   - id: "1"
//!     title: "10% off at Starbucks"
//!     merchant: "Starbucks"
//!     reward_amount: "10"
//!     reward_currency: SAR
//!     description: "Get 10% discount on all drinks."
//!     terms: "Valid once per user."
//!     thumbnail_url: "https://via.placeholder.com/300x200?text=Starbucks"
//!     expires_at: 2025-12-10T00:00:00Z
//! ```

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};

use dealbook_api::db::{self, PgPromotionStore, PromotionStore, RepositoryError};
use dealbook_api::models::Promotion;
use dealbook_core::{PromotionId, RewardCurrency};

use super::database_url;

/// Seed file used when `--file` is not given, relative to the workspace root.
pub const DEFAULT_SEED_FILE: &str = "crates/cli/seed/promotions.yaml";

/// Top-level seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    pub promotions: Vec<SeedPromotion>,
}

/// One promotion entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedPromotion {
    pub id: String,
    pub title: String,
    pub merchant: String,
    pub reward_amount: Decimal,
    pub reward_currency: String,
    pub description: String,
    #[serde(default)]
    pub terms: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Defaults to the time of seeding.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SeedPromotion {
    fn into_promotion(self, seeded_at: DateTime<Utc>) -> Promotion {
        Promotion {
            id: PromotionId::new(self.id),
            title: self.title,
            merchant: self.merchant,
            reward_amount: self.reward_amount,
            reward_currency: RewardCurrency::new(self.reward_currency),
            description: self.description,
            terms: self.terms,
            thumbnail_url: self.thumbnail_url,
            expires_at: self.expires_at,
            created_at: self.created_at.unwrap_or(seeded_at),
        }
    }
}

/// Check a seed file for problems. Returns one message per problem.
#[must_use]
pub fn validate(file: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, promo) in file.promotions.iter().enumerate() {
        let at = format!("promotions[{index}] (id {:?})", promo.id);

        if promo.id.trim().is_empty() {
            errors.push(format!("{at}: id must not be empty"));
        } else if !seen.insert(promo.id.as_str()) {
            errors.push(format!("{at}: duplicate id"));
        }
        if promo.title.trim().is_empty() {
            errors.push(format!("{at}: title must not be empty"));
        }
        if promo.merchant.trim().is_empty() {
            errors.push(format!("{at}: merchant must not be empty"));
        }
        if promo.reward_currency.trim().is_empty() {
            errors.push(format!("{at}: reward_currency must not be empty"));
        }
        if promo.reward_amount.is_sign_negative() {
            errors.push(format!("{at}: reward_amount must not be negative"));
        }
        if promo.reward_amount.scale() > 2 {
            errors.push(format!("{at}: reward_amount has more than 2 decimal places"));
        }
        let currency = RewardCurrency::new(promo.reward_currency.trim());
        if currency.is_percent() && promo.reward_amount > Decimal::ONE_HUNDRED {
            errors.push(format!("{at}: PERCENT reward_amount must not exceed 100"));
        }
        if currency.is_free_item() && !promo.reward_amount.fract().is_zero() {
            errors.push(format!("{at}: FREE_ITEM reward_amount must be a whole number of items"));
        }
        if let (Some(expires), Some(created)) = (promo.expires_at, promo.created_at)
            && expires < created
        {
            errors.push(format!("{at}: expires_at is before created_at"));
        }
    }

    errors
}

/// Seed promotions from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, delete every promotion (and favorite) first
/// * `dry_run` - If true, stop after validation
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or database operations fail.
pub async fn promotions(
    file_path: &str,
    clear_existing: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading promotions from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    info!(promotions = file.promotions.len(), "Parsed seed file");

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    if dry_run {
        info!("Seed file is valid (dry run, database untouched)");
        return Ok(());
    }

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let store = PgPromotionStore::new(pool);

    if clear_existing {
        let removed = store.delete_all().await?;
        info!(removed, "Cleared existing promotions");
    }

    let seeded_at = Utc::now();
    let mut inserted = 0_usize;
    let mut skipped = 0_usize;

    for seed in file.promotions {
        let promotion = seed.into_promotion(seeded_at);
        match store.insert(&promotion).await {
            Ok(()) => {
                info!(id = %promotion.id, reward = %promotion.reward(), "Inserted promotion");
                inserted += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                warn!(id = %promotion.id, "Promotion already exists, skipping");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Promotions inserted: {inserted}");
    info!("  Promotions skipped (already exist): {skipped}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DEFAULT_SEED: &str = include_str!("../../seed/promotions.yaml");

    fn parse(yaml: &str) -> SeedFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_default_seed_is_valid() {
        let file = parse(DEFAULT_SEED);
        assert_eq!(file.promotions.len(), 15);
        assert!(validate(&file).is_empty(), "{:?}", validate(&file));
    }

    #[test]
    fn test_default_seed_values() {
        let file = parse(DEFAULT_SEED);
        let starbucks = file.promotions.into_iter().next().unwrap();
        let promotion = starbucks.into_promotion(Utc::now());

        assert_eq!(promotion.id.as_str(), "1");
        assert_eq!(promotion.reward_amount, Decimal::from(10));
        assert_eq!(promotion.reward_currency.as_str(), "SAR");
        assert_eq!(
            promotion.expires_at.unwrap().to_rfc3339(),
            "2025-12-10T00:00:00+00:00"
        );
    }

    #[test]
    fn test_missing_expiry_never_expires() {
        let file = parse(
            r#"
promotions:
  - id: "evergreen"
    title: "Always on"
    merchant: "Extra"
    reward_amount: "5"
    reward_currency: PERCENT
    description: "No end date."
    thumbnail_url: "https://example.com/e.png"
"#,
        );
        let seeded_at = Utc::now();
        let promotion = file
            .promotions
            .into_iter()
            .next()
            .unwrap()
            .into_promotion(seeded_at);

        assert!(promotion.expires_at.is_none());
        assert_eq!(promotion.created_at, seeded_at);
        assert!(promotion.terms.is_empty());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let file = parse(
            r#"
promotions:
  - id: "1"
    title: ""
    merchant: "Extra"
    reward_amount: "-1"
    reward_currency: SAR
    description: "d"
    thumbnail_url: "t"
  - id: "1"
    title: "dup"
    merchant: "Extra"
    reward_amount: "1.005"
    reward_currency: SAR
    description: "d"
    thumbnail_url: "t"
"#,
        );
        let errors = validate(&file);

        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("title must not be empty")));
        assert!(errors.iter().any(|e| e.contains("must not be negative")));
        assert!(errors.iter().any(|e| e.contains("duplicate id")));
        assert!(errors.iter().any(|e| e.contains("decimal places")));
    }

    #[test]
    fn test_sentinel_rewards_are_checked() {
        let file = parse(
            r#"
promotions:
  - id: "pct"
    title: "Too generous"
    merchant: "Extra"
    reward_amount: "150"
    reward_currency: PERCENT
    description: "d"
    thumbnail_url: "t"
  - id: "half"
    title: "Half a coffee"
    merchant: "Costa"
    reward_amount: "0.5"
    reward_currency: FREE_ITEM
    description: "d"
    thumbnail_url: "t"
  - id: "ok"
    title: "Fine"
    merchant: "Costa"
    reward_amount: "100"
    reward_currency: PERCENT
    description: "d"
    thumbnail_url: "t"
"#,
        );
        let errors = validate(&file);

        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors[0].contains("\"pct\"") && errors[0].contains("must not exceed 100"));
        assert!(errors[1].contains("\"half\"") && errors[1].contains("whole number"));
    }

    #[test]
    fn test_default_seed_rewards_display() {
        let rewards: Vec<String> = parse(DEFAULT_SEED)
            .promotions
            .into_iter()
            .take(3)
            .map(|seed| seed.into_promotion(Utc::now()).reward().to_string())
            .collect();

        assert_eq!(rewards, ["10 SAR", "1 free", "20 SAR"]);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<SeedFile, _> = serde_yaml::from_str(
            r#"
promotions:
  - id: "1"
    title: "t"
    merchant: "m"
    reward_amount: "1"
    reward_currency: SAR
    description: "d"
    thumbnail_url: "t"
    discount: 3
"#,
        );
        assert!(result.is_err());
    }
}
