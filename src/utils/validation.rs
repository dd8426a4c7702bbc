use crate::utils::error::{MigrationError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub const SUPPORTED_STORE_SCHEMES: [&str; 2] = ["memory", "file"];

pub fn validate_store_uri(field_name: &str, uri: &str) -> Result<Url> {
    if uri.trim().is_empty() {
        return Err(MigrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri.to_string(),
            reason: "Store URI cannot be empty".to_string(),
        });
    }

    let invalid = |reason: String| MigrationError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: uri.to_string(),
        reason,
    };

    let url = match Url::parse(uri) {
        Ok(url) => url,
        // 沒有 scheme 時視為相對於工作目錄的檔案路徑
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = std::env::current_dir()?.join(uri);
            Url::from_file_path(&path)
                .map_err(|_| invalid(format!("Cannot use {} as a store path", path.display())))?
        }
        Err(e) => return Err(invalid(format!("Invalid URI format: {}", e))),
    };

    if !SUPPORTED_STORE_SCHEMES.contains(&url.scheme()) {
        return Err(invalid(format!(
            "Unsupported store scheme: {}. Supported schemes: {}",
            url.scheme(),
            SUPPORTED_STORE_SCHEMES.join(", ")
        )));
    }

    Ok(url)
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(MigrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(MigrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Allowed values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MigrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 檢查 id 不重複且非空
pub fn validate_unique_ids<'a, I>(field_name: &str, ids: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for id in ids {
        validate_non_empty_string(field_name, id)?;
        if !seen.insert(id) {
            return Err(MigrationError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: id.to_string(),
                reason: "Duplicate id".to_string(),
            });
        }
    }
    Ok(())
}
