//! Offset pagination for the listing endpoints.

use serde::Deserialize;

use crate::domain::validation::Violations;

/// A validated `(page, limit)` pair. `page` is one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Number of rows to skip before this page starts.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationDefaults {
    pub page: u32,
    pub limit: u32,
    pub max_limit: u32,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 3,
            max_limit: 100,
        }
    }
}

/// Pagination parameters exactly as they arrived in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn new(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    /// Apply defaults and bounds. All problems are reported together.
    pub fn resolve(&self, defaults: &PaginationDefaults) -> Result<PageRequest, Violations> {
        let mut violations = Violations::new();

        let page = parse_positive(self.page.as_deref(), defaults.page, "page", &mut violations);
        let limit = parse_positive(self.limit.as_deref(), defaults.limit, "limit", &mut violations);

        if let Some(limit) = limit
            && limit > defaults.max_limit
        {
            violations.push(
                "limit",
                format!(
                    "This value should be less than or equal to {}.",
                    defaults.max_limit
                ),
            );
        }

        match (page, limit) {
            (Some(page), Some(limit)) if violations.is_empty() => Ok(PageRequest::new(page, limit)),
            _ => Err(violations),
        }
    }
}

fn parse_positive(
    raw: Option<&str>,
    default: u32,
    field: &'static str,
    violations: &mut Violations,
) -> Option<u32> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Some(default),
        Some(raw) => raw,
    };

    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            violations.push(field, "This value should be a positive integer.");
            None
        }
    }
}
