use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DISPLAY_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// A single registration record. Every value is kept as text, the way it
/// appears in the source data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub created_dt: String,
    pub data_source_modified_dt: String,
    pub entity_type: String,
    pub legal_name: String,
    pub dba_name: String,
    pub physical_address: String,
    pub p_street: String,
    pub p_city: String,
    pub p_state: String,
    pub p_zip_code: String,
    pub phone: String,
    pub mailing_address: String,
    pub m_street: String,
    pub m_city: String,
    pub m_state: String,
    pub m_zip_code: String,
    pub usdot_number: String,
    pub power_units: String,
    pub mcs_150_form_date: String,
    pub drivers: String,
    pub mcs_150_mileage_year: String,
    pub id: String,
    pub credit_score: String,
    pub record_status: String,
    pub mc_mx_ff_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CreatedDt,
    DataSourceModifiedDt,
    EntityType,
    LegalName,
    DbaName,
    PhysicalAddress,
    PStreet,
    PCity,
    PState,
    PZipCode,
    Phone,
    MailingAddress,
    MStreet,
    MCity,
    MState,
    MZipCode,
    UsdotNumber,
    PowerUnits,
    Mcs150FormDate,
    Drivers,
    Mcs150MileageYear,
    Id,
    CreditScore,
    RecordStatus,
    McMxFfNumber,
}

impl Field {
    pub const ALL: [Field; 25] = [
        Field::CreatedDt,
        Field::DataSourceModifiedDt,
        Field::EntityType,
        Field::LegalName,
        Field::DbaName,
        Field::PhysicalAddress,
        Field::PStreet,
        Field::PCity,
        Field::PState,
        Field::PZipCode,
        Field::Phone,
        Field::MailingAddress,
        Field::MStreet,
        Field::MCity,
        Field::MState,
        Field::MZipCode,
        Field::UsdotNumber,
        Field::PowerUnits,
        Field::Mcs150FormDate,
        Field::Drivers,
        Field::Mcs150MileageYear,
        Field::Id,
        Field::CreditScore,
        Field::RecordStatus,
        Field::McMxFfNumber,
    ];

    /// Columns of the main table, in display order.
    pub const TABLE: [Field; 11] = [
        Field::CreatedDt,
        Field::DataSourceModifiedDt,
        Field::EntityType,
        Field::LegalName,
        Field::DbaName,
        Field::PhysicalAddress,
        Field::Phone,
        Field::UsdotNumber,
        Field::McMxFfNumber,
        Field::PowerUnits,
        Field::Mcs150FormDate,
    ];

    /// Key used in the data files.
    pub fn name(&self) -> &'static str {
        match self {
            Field::CreatedDt => "created_dt",
            Field::DataSourceModifiedDt => "data_source_modified_dt",
            Field::EntityType => "entity_type",
            Field::LegalName => "legal_name",
            Field::DbaName => "dba_name",
            Field::PhysicalAddress => "physical_address",
            Field::PStreet => "p_street",
            Field::PCity => "p_city",
            Field::PState => "p_state",
            Field::PZipCode => "p_zip_code",
            Field::Phone => "phone",
            Field::MailingAddress => "mailing_address",
            Field::MStreet => "m_street",
            Field::MCity => "m_city",
            Field::MState => "m_state",
            Field::MZipCode => "m_zip_code",
            Field::UsdotNumber => "usdot_number",
            Field::PowerUnits => "power_units",
            Field::Mcs150FormDate => "mcs_150_form_date",
            Field::Drivers => "drivers",
            Field::Mcs150MileageYear => "mcs_150_mileage_year",
            Field::Id => "id",
            Field::CreditScore => "credit_score",
            Field::RecordStatus => "record_status",
            Field::McMxFfNumber => "mc_mx_ff_number",
        }
    }

    /// Column header shown in the table. Fields without a dedicated header
    /// use their data key.
    pub fn label(&self) -> &'static str {
        match self {
            Field::CreatedDt => "Created_DT",
            Field::DataSourceModifiedDt => "Modified_DT",
            Field::EntityType => "Entity",
            Field::LegalName => "Legal name",
            Field::DbaName => "DBA name",
            Field::PhysicalAddress => "Physical address",
            Field::Phone => "Phone",
            Field::UsdotNumber => "DOT",
            Field::McMxFfNumber => "MC/MX/FF",
            Field::PowerUnits => "Power units",
            Field::Mcs150FormDate => "Out of service date",
            other => other.name(),
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self, Field::CreatedDt | Field::DataSourceModifiedDt)
    }
}

impl Record {
    /// Builds a record from `(key, value)` pairs. Keys that are not record
    /// fields are skipped.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut record = Record::default();
        for (name, value) in pairs {
            if let Some(field) = Field::from_name(name) {
                *record.get_mut(field) = value;
            }
        }
        record
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::CreatedDt => &self.created_dt,
            Field::DataSourceModifiedDt => &self.data_source_modified_dt,
            Field::EntityType => &self.entity_type,
            Field::LegalName => &self.legal_name,
            Field::DbaName => &self.dba_name,
            Field::PhysicalAddress => &self.physical_address,
            Field::PStreet => &self.p_street,
            Field::PCity => &self.p_city,
            Field::PState => &self.p_state,
            Field::PZipCode => &self.p_zip_code,
            Field::Phone => &self.phone,
            Field::MailingAddress => &self.mailing_address,
            Field::MStreet => &self.m_street,
            Field::MCity => &self.m_city,
            Field::MState => &self.m_state,
            Field::MZipCode => &self.m_zip_code,
            Field::UsdotNumber => &self.usdot_number,
            Field::PowerUnits => &self.power_units,
            Field::Mcs150FormDate => &self.mcs_150_form_date,
            Field::Drivers => &self.drivers,
            Field::Mcs150MileageYear => &self.mcs_150_mileage_year,
            Field::Id => &self.id,
            Field::CreditScore => &self.credit_score,
            Field::RecordStatus => &self.record_status,
            Field::McMxFfNumber => &self.mc_mx_ff_number,
        }
    }

    fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::CreatedDt => &mut self.created_dt,
            Field::DataSourceModifiedDt => &mut self.data_source_modified_dt,
            Field::EntityType => &mut self.entity_type,
            Field::LegalName => &mut self.legal_name,
            Field::DbaName => &mut self.dba_name,
            Field::PhysicalAddress => &mut self.physical_address,
            Field::PStreet => &mut self.p_street,
            Field::PCity => &mut self.p_city,
            Field::PState => &mut self.p_state,
            Field::PZipCode => &mut self.p_zip_code,
            Field::Phone => &mut self.phone,
            Field::MailingAddress => &mut self.mailing_address,
            Field::MStreet => &mut self.m_street,
            Field::MCity => &mut self.m_city,
            Field::MState => &mut self.m_state,
            Field::MZipCode => &mut self.m_zip_code,
            Field::UsdotNumber => &mut self.usdot_number,
            Field::PowerUnits => &mut self.power_units,
            Field::Mcs150FormDate => &mut self.mcs_150_form_date,
            Field::Drivers => &mut self.drivers,
            Field::Mcs150MileageYear => &mut self.mcs_150_mileage_year,
            Field::Id => &mut self.id,
            Field::CreditScore => &mut self.credit_score,
            Field::RecordStatus => &mut self.record_status,
            Field::McMxFfNumber => &mut self.mc_mx_ff_number,
        }
    }

    /// Value as it is rendered. Only the two timestamp fields are reformatted.
    pub fn display(&self, field: Field) -> String {
        let raw = self.get(field);
        if field.is_timestamp() {
            format_timestamp(raw)
        } else {
            raw.to_string()
        }
    }

    /// All fields as one csv line.
    pub fn to_csv_line(&self) -> String {
        Field::ALL
            .iter()
            .map(|&f| wrap_cell_content(self.get(f)))
            .collect::<Vec<String>>()
            .join(",")
    }
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.chars().any(|c| c == '"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS` (UTC). Text that does not
/// parse as a timestamp is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    parse_timestamp(raw.trim())
        .map(|ts| ts.format(DISPLAY_TIMESTAMP).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_ignores_unknown_keys() {
        let record = Record::from_pairs([
            ("legal_name", "ACME".to_string()),
            ("not_a_field", "x".to_string()),
            ("usdot_number", "123".to_string()),
        ]);
        assert_eq!(record.legal_name, "ACME");
        assert_eq!(record.get(Field::UsdotNumber), "123");
        assert_eq!(record.dba_name, "");
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("nope"), None);
    }

    #[test]
    fn timestamps_are_formatted_for_display() {
        assert_eq!(format_timestamp("2022-01-01T00:00:00Z"), "2022-01-01 00:00:00");
        assert_eq!(
            format_timestamp("2023-05-17T13:45:10.000"),
            "2023-05-17 13:45:10"
        );
        assert_eq!(
            format_timestamp("2023-05-17T15:45:10+02:00"),
            "2023-05-17 13:45:10"
        );
        assert_eq!(format_timestamp("2021-03-04"), "2021-03-04 00:00:00");
        assert_eq!(format_timestamp("not a date"), "not a date");
    }

    #[test]
    fn only_timestamp_fields_are_reformatted() {
        let record = Record {
            created_dt: "2022-01-01T00:00:00Z".into(),
            mcs_150_form_date: "2022-01-01T00:00:00Z".into(),
            ..Default::default()
        };
        assert_eq!(record.display(Field::CreatedDt), "2022-01-01 00:00:00");
        assert_eq!(
            record.display(Field::Mcs150FormDate),
            "2022-01-01T00:00:00Z"
        );
    }

    #[test]
    fn csv_line_quotes_cells() {
        let record = Record {
            legal_name: "ACME, INC".into(),
            dba_name: "The \"Best\"".into(),
            ..Default::default()
        };
        let line = record.to_csv_line();
        assert!(line.contains("\"ACME, INC\""));
        assert!(line.contains("\"The \"\"Best\"\"\""));
        assert_eq!(line.split(',').count() - 1, 25);
    }
}
