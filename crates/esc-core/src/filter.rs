// ── Filter and sort engine ──
//
// Pure functions over fetched line snapshots. `apply` sorts first and
// filters second, so survivors keep their sorted order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use strum::EnumString;
use uuid::Uuid;

use crate::error::CoreError;
use esc_api::Line;

// ── Filter expressions ───────────────────────────────────────────────

/// A parsed `field:value` filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// Substring of the hyphenated lowercase id.
    Id(String),
    /// Substring of the name.
    Name(String),
    /// Maintenance flag equality (`m:t` / `m:f`).
    Maintenance(bool),
    /// Any other field. Matches every line.
    Unknown { field: String, value: String },
}

impl FilterSpec {
    /// Parse `field:value`. The split happens at the first `:`.
    pub fn parse(expression: &str) -> Result<Self, CoreError> {
        let (field, value) = expression
            .split_once(':')
            .ok_or_else(|| CoreError::FilterParse {
                expression: expression.to_owned(),
                reason: "expected `field:value`".into(),
            })?;

        let spec = match field {
            "id" => Self::Id(value.to_ascii_lowercase()),
            "name" => Self::Name(value.to_owned()),
            "m" => match value {
                "t" => Self::Maintenance(true),
                "f" => Self::Maintenance(false),
                other => {
                    return Err(CoreError::FilterParse {
                        expression: expression.to_owned(),
                        reason: format!("maintenance flag must be `t` or `f`, got `{other}`"),
                    });
                }
            },
            other => {
                tracing::warn!(field = other, "unknown filter field, matching all lines");
                Self::Unknown {
                    field: other.to_owned(),
                    value: value.to_owned(),
                }
            }
        };
        Ok(spec)
    }

    pub fn matches(&self, line: &Line) -> bool {
        match self {
            Self::Id(needle) => line.id.hyphenated().to_string().contains(needle.as_str()),
            Self::Name(needle) => line.name.contains(needle.as_str()),
            Self::Maintenance(flag) => line.maintenance == *flag,
            Self::Unknown { .. } => true,
        }
    }
}

impl FromStr for FilterSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id:{v}"),
            Self::Name(v) => write!(f, "name:{v}"),
            Self::Maintenance(flag) => write!(f, "m:{}", if *flag { "t" } else { "f" }),
            Self::Unknown { field, value } => write!(f, "{field}:{value}"),
        }
    }
}

// ── Sort keys ────────────────────────────────────────────────────────

/// Field to order lines by.
///
/// `id` compares the 128-bit value. Other known fields compare their
/// values; an unknown field leaves the fetched order untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, EnumString)]
pub enum SortKey {
    #[default]
    #[strum(serialize = "id")]
    Id,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "lat")]
    Lat,
    #[strum(serialize = "lng")]
    Lng,
    #[strum(serialize = "m")]
    Maintenance,
    #[strum(default)]
    Unordered(String),
}

impl SortKey {
    fn compare(&self, a: &Line, b: &Line) -> Ordering {
        match self {
            Self::Id => a.id.as_u128().cmp(&b.id.as_u128()),
            Self::Name => a.name.cmp(&b.name),
            Self::Lat => cmp_coord(a.lat, b.lat),
            Self::Lng => cmp_coord(a.lng, b.lng),
            Self::Maintenance => a.maintenance.cmp(&b.maintenance),
            Self::Unordered(_) => Ordering::Equal,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Lat => "lat",
            Self::Lng => "lng",
            Self::Maintenance => "m",
            Self::Unordered(field) => field.as_str(),
        })
    }
}

/// Absent coordinates sort after present ones.
fn cmp_coord(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// Sort `lines` (stable) then keep those passing both the group and the
/// field filter.
pub fn apply(
    mut lines: Vec<Line>,
    sort: &SortKey,
    group: Option<i64>,
    filter: Option<&FilterSpec>,
) -> Vec<Line> {
    if let SortKey::Unordered(field) = sort {
        tracing::warn!(field = field.as_str(), "unknown sort field, keeping fetched order");
    }
    lines.sort_by(|a, b| sort.compare(a, b));

    let before = lines.len();
    lines.retain(|line| {
        group.is_none_or(|g| line.groups.contains(&g)) && filter.is_none_or(|f| f.matches(line))
    });
    tracing::debug!(before, after = lines.len(), %sort, "lines filtered");
    lines
}

/// Resolve an id or id prefix against `lines`.
///
/// An exact id wins; otherwise the prefix must match exactly one line.
pub fn find_by_prefix<'a>(lines: &'a [Line], needle: &str) -> Result<&'a Line, CoreError> {
    if let Ok(id) = Uuid::parse_str(needle) {
        if let Some(line) = lines.iter().find(|l| l.id == id) {
            return Ok(line);
        }
    }

    let needle_lower = needle.to_ascii_lowercase();
    let mut matches = lines
        .iter()
        .filter(|l| l.id.hyphenated().to_string().starts_with(&needle_lower));

    match (matches.next(), matches.count()) {
        (Some(line), 0) => Ok(line),
        (None, _) => Err(CoreError::NotFound {
            entity_type: "line".into(),
            identifier: needle.to_owned(),
        }),
        (Some(_), rest) => Err(CoreError::Ambiguous {
            entity_type: "line".into(),
            identifier: needle.to_owned(),
            count: rest + 1,
        }),
    }
}
