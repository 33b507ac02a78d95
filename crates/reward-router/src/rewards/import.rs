use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{MethodId, MethodKind, RewardMethod};
use super::registry::MethodRegistry;

/// Errors raised while reading or writing the method table as CSV.
#[derive(Debug, thiserror::Error)]
pub enum MethodImportError {
    #[error("failed to read method table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid method table CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("duplicate method id '{0}'")]
    DuplicateId(MethodId),
    #[error("method '{id}' has an invalid {field}: {value}")]
    InvalidValue {
        id: MethodId,
        field: &'static str,
        value: f64,
    },
    #[error("method table may hold at most one milestone route, found {0}")]
    MultipleMilestoneRoutes(usize),
}

/// Column layout shared by import and export.
#[derive(Debug, Serialize, Deserialize)]
struct MethodRow {
    id: String,
    name: String,
    #[serde(deserialize_with = "flexible_bool")]
    active: bool,
    kind: MethodKind,
    #[serde(default)]
    card_pct: f64,
    #[serde(default)]
    voucher_pct: f64,
    #[serde(default)]
    portal_pct: f64,
    #[serde(default)]
    float_pct: f64,
    #[serde(default)]
    monthly_cap: f64,
    #[serde(default)]
    utilisation_limit_pct: f64,
    #[serde(default)]
    current_utilisation_pct: f64,
}

impl From<&RewardMethod> for MethodRow {
    fn from(method: &RewardMethod) -> Self {
        Self {
            id: method.id.to_string(),
            name: method.name.clone(),
            active: method.active,
            kind: method.kind,
            card_pct: method.card_reward_pct,
            voucher_pct: method.voucher_discount_pct,
            portal_pct: method.portal_reward_pct,
            float_pct: method.float_benefit_pct,
            monthly_cap: method.monthly_cap,
            utilisation_limit_pct: method.utilisation_limit_pct,
            current_utilisation_pct: method.current_utilisation_pct,
        }
    }
}

impl MethodRow {
    fn into_method(self) -> Result<RewardMethod, MethodImportError> {
        let id = MethodId::new(self.id.trim());
        let checks = [
            ("card_pct", self.card_pct),
            ("voucher_pct", self.voucher_pct),
            ("portal_pct", self.portal_pct),
            ("float_pct", self.float_pct),
            ("monthly_cap", self.monthly_cap),
            ("utilisation_limit_pct", self.utilisation_limit_pct),
            ("current_utilisation_pct", self.current_utilisation_pct),
        ];
        for (field, value) in checks {
            if !value.is_finite() || (field == "monthly_cap" && value < 0.0) {
                return Err(MethodImportError::InvalidValue { id, field, value });
            }
        }

        Ok(RewardMethod {
            id,
            name: self.name.trim().to_string(),
            active: self.active,
            kind: self.kind,
            card_reward_pct: self.card_pct,
            voucher_discount_pct: self.voucher_pct,
            portal_reward_pct: self.portal_pct,
            float_benefit_pct: self.float_pct,
            monthly_cap: self.monthly_cap,
            utilisation_limit_pct: self.utilisation_limit_pct,
            current_utilisation_pct: self.current_utilisation_pct,
        })
    }
}

pub struct MethodTableCsv;

impl MethodTableCsv {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<MethodRegistry, MethodImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<MethodRegistry, MethodImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for record in csv_reader.deserialize::<MethodRow>() {
            let method = record?.into_method()?;
            if !seen.insert(method.id.clone()) {
                return Err(MethodImportError::DuplicateId(method.id));
            }
            methods.push(method);
        }

        let milestone_routes = methods
            .iter()
            .filter(|method| method.kind == MethodKind::Milestone)
            .count();
        if milestone_routes > 1 {
            return Err(MethodImportError::MultipleMilestoneRoutes(milestone_routes));
        }

        Ok(MethodRegistry::new(methods))
    }

    pub fn write<W: Write>(registry: &MethodRegistry, writer: W) -> Result<(), MethodImportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for method in registry.methods() {
            csv_writer.serialize(MethodRow::from(method))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a yes/no value, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "id,name,active,kind,card_pct,voucher_pct,portal_pct,float_pct,monthly_cap,utilisation_limit_pct,current_utilisation_pct\n";

    #[test]
    fn parses_rows_in_order() {
        let csv = format!(
            "{HEADER}kiwi,Kiwi UPI,yes,milestone,0,0,0,0,1800,30,15\namex,Amex portal,0,fixed,1.5,2,1,0,0,30,40\n"
        );
        let registry = MethodTableCsv::from_reader(Cursor::new(csv)).expect("parses");
        let ids: Vec<&str> = registry.methods().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["kiwi", "amex"]);
        let amex = &registry.methods()[1];
        assert!(!amex.active);
        assert_eq!(amex.kind, MethodKind::Fixed);
        assert_eq!(amex.non_card_pct(), 3.0);
        assert!(amex.utilisation_warning());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let csv = format!("{HEADER}a,A,1,fixed,1,0,0,0,0,30,0\na,B,1,fixed,1,0,0,0,0,30,0\n");
        match MethodTableCsv::from_reader(Cursor::new(csv)) {
            Err(MethodImportError::DuplicateId(id)) => assert_eq!(id.as_str(), "a"),
            other => panic!("expected duplicate id, got {other:?}"),
        }
    }

    #[test]
    fn rejects_second_milestone_route_and_negative_caps() {
        let two = format!(
            "{HEADER}a,A,1,milestone,0,0,0,0,0,30,0\nb,B,1,milestone,0,0,0,0,0,30,0\n"
        );
        assert!(matches!(
            MethodTableCsv::from_reader(Cursor::new(two)),
            Err(MethodImportError::MultipleMilestoneRoutes(2))
        ));

        let negative = format!("{HEADER}a,A,1,fixed,1,0,0,0,-5,30,0\n");
        assert!(matches!(
            MethodTableCsv::from_reader(Cursor::new(negative)),
            Err(MethodImportError::InvalidValue {
                field: "monthly_cap",
                ..
            })
        ));
    }

    #[test]
    fn export_then_import_preserves_standard_table() {
        let registry = MethodRegistry::standard();
        let mut buffer = Vec::new();
        MethodTableCsv::write(&registry, &mut buffer).expect("writes");
        let text = String::from_utf8(buffer.clone()).expect("utf8");
        assert!(text.starts_with("id,name,active,kind"));
        let parsed = MethodTableCsv::from_reader(Cursor::new(buffer)).expect("parses");
        assert_eq!(parsed, registry);
    }
}
