use std::collections::BTreeMap;

use crate::workflows::requisition::TerminationRecord;

/// Fixed column positions of the termination export.
///
/// The layout is a versioned contract with the payroll system that produces
/// the file; it is pinned here and never re-derived from the header row.
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub external_id: usize,
    pub full_name: usize,
    pub job_title: usize,
    pub cost_center: usize,
    pub termination_date: usize,
    pub hierarchy_id: usize,
    /// Columns carried through without interpretation, by field name.
    pub passthrough: &'static [(&'static str, usize)],
}

impl ColumnLayout {
    pub const V1: Self = Self {
        external_id: 0,
        full_name: 1,
        job_title: 2,
        cost_center: 3,
        termination_date: 4,
        hierarchy_id: 5,
        passthrough: &[
            ("admission_date", 6),
            ("contract_type", 7),
            ("work_shift", 8),
            ("salary", 9),
            ("manager_name", 10),
            ("manager_registration", 11),
            ("location", 12),
            ("business_unit", 13),
            ("union_code", 14),
            ("termination_reason", 15),
            ("notice_type", 16),
            ("email", 17),
            ("phone", 18),
            ("education_level", 19),
            ("replacement_eligible", 20),
        ],
    };

    fn field(fields: &[&str], index: usize) -> String {
        fields.get(index).map(|value| value.to_string()).unwrap_or_default()
    }

    /// Builds a record from one split row. Missing trailing columns become
    /// empty strings; validity is judged by the caller.
    pub fn record_from_fields(&self, fields: &[&str]) -> TerminationRecord {
        let mut passthrough = BTreeMap::new();
        for (name, index) in self.passthrough {
            passthrough.insert((*name).to_string(), Self::field(fields, *index));
        }

        TerminationRecord {
            external_id: Self::field(fields, self.external_id),
            full_name: Self::field(fields, self.full_name),
            job_title: Self::field(fields, self.job_title),
            cost_center: Self::field(fields, self.cost_center),
            termination_date: Self::field(fields, self.termination_date),
            hierarchy_id: Self::field(fields, self.hierarchy_id),
            passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_from_fields_tolerates_short_rows() {
        let record = ColumnLayout::V1.record_from_fields(&["1042", "Ana Souza"]);
        assert_eq!(record.external_id, "1042");
        assert_eq!(record.full_name, "Ana Souza");
        assert_eq!(record.job_title, "");
        assert_eq!(record.passthrough.len(), ColumnLayout::V1.passthrough.len());
        assert_eq!(record.passthrough.get("email"), Some(&String::new()));
    }
}
