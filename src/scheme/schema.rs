use serde::Serialize;

/// Storage type of a model field; each maps to one Postgres type used for casts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Uuid,
    Text,
    Integer,
    Boolean,
    Date,
    Timestamp,
    Json,
}

impl FieldKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Uuid => "uuid",
            FieldKind::Text => "text",
            FieldKind::Integer => "bigint",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Timestamp => "timestamptz",
            FieldKind::Json => "jsonb",
        }
    }

    /// Example value used for generated request bodies and CSV templates
    pub fn sample(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            FieldKind::Uuid => json!("00000000-0000-0000-0000-000000000000"),
            FieldKind::Text => json!(""),
            FieldKind::Integer => json!(0),
            FieldKind::Boolean => json!(false),
            FieldKind::Date => json!("2024-01-01"),
            FieldKind::Timestamp => json!("2024-01-01T00:00:00Z"),
            FieldKind::Json => json!({}),
        }
    }
}

/// Content rule applied to client input after type coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// Lower-cased, then checked against the email format
    Email,
    /// Account password policy
    Password,
    OneOf(&'static [&'static str]),
}

/// Tenant-scoped row a uuid field points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub table: &'static str,
    pub key: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub max_length: Option<usize>,
    pub searchable: bool,
    /// Never returned to clients
    pub hidden: bool,
    /// Stored as an Argon2 hash
    pub secret: bool,
    /// Managed by the server; rejected in client input
    pub system: bool,
    pub in_report: bool,
    pub rule: Option<FieldRule>,
    /// Must name a row of the caller's organization
    pub references: Option<Reference>,
}

impl FieldDef {
    pub fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            max_length: None,
            searchable: false,
            hidden: false,
            secret: false,
            system: false,
            in_report: true,
            rule: None,
            references: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self.hidden = true;
        self.in_report = false;
        self
    }

    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    pub fn no_report(mut self) -> Self {
        self.in_report = false;
        self
    }

    pub fn email(mut self) -> Self {
        self.rule = Some(FieldRule::Email);
        self
    }

    pub fn password_policy(mut self) -> Self {
        self.rule = Some(FieldRule::Password);
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.rule = Some(FieldRule::OneOf(allowed));
        self
    }

    pub fn references(mut self, table: &'static str, key: &'static str) -> Self {
        self.references = Some(Reference { table, key });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSchema {
    pub name: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    /// Column holding the owning organization; rows are always scoped by it
    pub tenant_column: Option<&'static str>,
    /// Column set to now() on every update
    pub touch_column: Option<&'static str>,
    pub fields: Vec<FieldDef>,
    pub write_permission: Option<&'static str>,
    pub creatable: bool,
    pub writable: bool,
    pub default_order: &'static str,
}

impl ModelSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_field(&self) -> Option<&FieldDef> {
        self.field(self.primary_key)
    }

    /// Resolve a CSV header cell, which may be either the label or the field name
    pub fn field_by_label_or_name(&self, header: &str) -> Option<&FieldDef> {
        let header = header.trim();
        self.fields
            .iter()
            .find(|f| f.label.eq_ignore_ascii_case(header) || f.name == header)
    }

    /// Fields a client may write
    pub fn input_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.system)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.hidden)
    }

    pub fn searchable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.searchable && !f.hidden)
    }

    pub fn report_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.in_report && !f.hidden)
    }

    /// Drop hidden fields from a row fetched with row_to_json
    pub fn redact(&self, mut row: serde_json::Map<String, serde_json::Value>) -> serde_json::Map<String, serde_json::Value> {
        for field in self.fields.iter().filter(|f| f.hidden) {
            row.remove(field.name);
        }
        row
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Small tenant-scoped model used across unit tests
    pub fn gadget() -> ModelSchema {
        ModelSchema {
            name: "gadget",
            table: "gadgets",
            primary_key: "gadget_id",
            tenant_column: Some("org_id"),
            touch_column: Some("updated_at"),
            fields: vec![
                FieldDef::new("gadget_id", "ID", FieldKind::Uuid).system(),
                FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
                FieldDef::new("name", "Name", FieldKind::Text).required().max(20).searchable(),
                FieldDef::new("serial", "Serial", FieldKind::Text).required().searchable(),
                FieldDef::new("quantity", "Quantity", FieldKind::Integer),
                FieldDef::new("active", "Active", FieldKind::Boolean),
                FieldDef::new("bought_on", "Bought On", FieldKind::Date),
                FieldDef::new("owner_id", "Owner", FieldKind::Uuid).references("users", "user_id"),
                FieldDef::new("extra", "Extra", FieldKind::Json).no_report(),
                FieldDef::new("pin", "PIN", FieldKind::Text).secret().password_policy(),
                FieldDef::new("contact", "Contact", FieldKind::Text).email().no_report(),
                FieldDef::new("state", "State", FieldKind::Text).one_of(&["new", "used"]).no_report(),
                FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
                FieldDef::new("updated_at", "Updated At", FieldKind::Timestamp).system(),
            ],
            write_permission: Some("canManageItems"),
            creatable: true,
            writable: true,
            default_order: "created_at desc",
        }
    }
}
