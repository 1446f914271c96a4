//! Movements (dated financial transactions) and their attachments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, dates::parse_date, labels, normalize::keys};

/// Direction of a movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Incoming,
    #[default]
    Outgoing,
}

impl MovementKind {
    /// Maps a normalised kind token; unknown or missing tokens are `Outgoing`.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("entrada" | "incoming" | "income" | "receita" | "credito") => Self::Incoming,
            _ => Self::Outgoing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// Settlement state of a movement.
///
/// Only `Paid` counts toward realised balances, `Pending` feeds the separate
/// pending total and `Cancelled` is excluded from every sum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Paid,
    #[default]
    Pending,
    Cancelled,
}

impl MovementStatus {
    /// Maps a normalised status token; unknown or missing tokens are `Pending`.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("pago" | "paid" | "realizado" | "quitado") => Self::Paid,
            Some("cancelado" | "cancelled" | "canceled" | "estornado") => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A stored file attached to a movement.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Attachment {
    pub id: String,
    pub movement_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub storage_path: String,
    pub public_url: Option<String>,
}

impl Attachment {
    /// Row in the persisted shape (current key names).
    pub fn to_row(&self) -> Value {
        let mut row = Map::new();
        put_text(&mut row, keys::ID[0], &self.id);
        put_text(&mut row, keys::ATTACHMENT_MOVEMENT_ID[0], &self.movement_id);
        put_text(&mut row, keys::FILE_NAME[0], &self.file_name);
        put_text(&mut row, keys::MIME_TYPE[0], &self.mime_type);
        row.insert(keys::FILE_SIZE[0].to_string(), json!(self.size_bytes));
        put_text(&mut row, keys::STORAGE_PATH[0], &self.storage_path);
        if let Some(url) = &self.public_url {
            put_text(&mut row, keys::PUBLIC_URL[0], url);
        }
        Value::Object(row)
    }
}

/// A normalised movement.
///
/// `total_value` is always `unit_value * quantity`; a total supplied by the
/// row or the client is never read. Serialises as [`Movement::to_row`].
#[derive(Clone, Debug, PartialEq)]
pub struct Movement {
    pub id: String,
    pub date: NaiveDate,
    /// The row had no usable date and `date` is the normalisation day.
    pub date_defaulted: bool,
    pub kind: MovementKind,
    pub fund_id: Option<String>,
    pub project_id: Option<String>,
    pub title: String,
    pub description: String,
    pub unit_value: MoneyCents,
    pub quantity: f64,
    pub total_value: MoneyCents,
    pub status: MovementStatus,
    /// The row carried a status column (older rows predate it).
    pub status_recorded: bool,
    pub category: String,
    pub payment_method: String,
    pub payee: String,
    pub cost_center: String,
    pub document_type: String,
    pub document_number: String,
    pub notes: String,
    pub attachments: Vec<Attachment>,
}

impl Movement {
    /// A paid movement with quantity 1 and every optional field empty.
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        kind: MovementKind,
        unit_value: MoneyCents,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            date_defaulted: false,
            kind,
            fund_id: None,
            project_id: None,
            title: String::new(),
            description: String::new(),
            unit_value,
            quantity: 1.0,
            total_value: unit_value,
            status: MovementStatus::Paid,
            status_recorded: true,
            category: String::new(),
            payment_method: String::new(),
            payee: String::new(),
            cost_center: String::new(),
            document_type: String::new(),
            document_number: String::new(),
            notes: String::new(),
            attachments: Vec::new(),
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == MovementStatus::Paid
    }

    /// Pending only counts when the row actually recorded it.
    pub fn counts_as_pending(&self) -> bool {
        self.status_recorded && self.status == MovementStatus::Pending
    }

    /// Recomputes `total_value` from unit value and quantity.
    pub fn recompute_total(&mut self) {
        self.total_value = self.unit_value.times(self.quantity);
    }

    /// Row in the persisted shape (current key names), attachments included.
    ///
    /// Fields the normaliser had to default (status, date) are left out so
    /// normalising the row again reproduces this movement.
    pub fn to_row(&self) -> Value {
        let mut row = self.write_fields();
        if !self.attachments.is_empty() {
            row.insert(
                keys::ATTACHMENTS[0].to_string(),
                Value::Array(self.attachments.iter().map(Attachment::to_row).collect()),
            );
        }
        Value::Object(row)
    }

    /// Row sent to the movements table: no nested attachments, no blank id.
    pub fn to_write_row(&self) -> Value {
        Value::Object(self.write_fields())
    }

    fn write_fields(&self) -> Map<String, Value> {
        let mut row = Map::new();
        put_text(&mut row, keys::ID[0], &self.id);
        if !self.date_defaulted {
            row.insert(keys::DATE[0].to_string(), json!(self.date.to_string()));
        }
        row.insert(keys::KIND[0].to_string(), json!(self.kind.as_str()));
        put_opt(&mut row, keys::FUND_ID[0], self.fund_id.as_deref());
        put_opt(&mut row, keys::PROJECT_ID[0], self.project_id.as_deref());
        put_text(&mut row, keys::TITLE[0], &self.title);
        put_text(&mut row, keys::DESCRIPTION[0], &self.description);
        row.insert(keys::UNIT_VALUE[0].to_string(), json!(self.unit_value));
        row.insert(keys::QUANTITY[0].to_string(), json!(self.quantity));
        row.insert("total_value".to_string(), json!(self.total_value));
        if self.status_recorded {
            row.insert(keys::STATUS[0].to_string(), json!(self.status.as_str()));
        }
        put_text(&mut row, keys::CATEGORY[0], &self.category);
        put_text(&mut row, keys::PAYMENT_METHOD[0], &self.payment_method);
        put_text(&mut row, keys::PAYEE[0], &self.payee);
        put_text(&mut row, keys::COST_CENTER[0], &self.cost_center);
        put_text(&mut row, keys::DOCUMENT_TYPE[0], &self.document_type);
        put_text(&mut row, keys::DOCUMENT_NUMBER[0], &self.document_number);
        put_text(&mut row, keys::NOTES[0], &self.notes);
        row
    }
}

impl Serialize for Movement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_row().serialize(serializer)
    }
}

fn put_text(row: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        row.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn put_opt(row: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        put_text(row, key, value);
    }
}

/// Client payload for creating or editing a movement.
///
/// Kind and status are free tokens resolved like persisted rows. A
/// `total_value` sent by the client is accepted and discarded.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovementDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub date: String,
    pub kind: String,
    #[serde(default)]
    pub fund_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_value: MoneyCents,
    pub quantity: f64,
    #[serde(default)]
    pub total_value: Option<MoneyCents>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MovementDraft {
    /// Validates the draft and produces the movement to persist.
    ///
    /// Unlike row normalisation this is strict: the save is rejected rather
    /// than defaulted.
    pub fn prepare(self) -> ResultEngine<Movement> {
        let fund_id = non_blank(self.fund_id);
        let project_id = non_blank(self.project_id);
        if fund_id.is_none() && project_id.is_none() {
            return Err(EngineError::MissingTarget);
        }

        let title = labels::normalize_display(&self.title)
            .ok_or_else(|| EngineError::InvalidMovement("title must not be empty".to_string()))?;

        let date = parse_date(&self.date)
            .ok_or_else(|| EngineError::InvalidDate(format!("invalid date: {}", self.date)))?;

        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(EngineError::InvalidAmount(
                "quantity must be greater than zero".to_string(),
            ));
        }
        if self.unit_value.is_negative() {
            return Err(EngineError::InvalidAmount(
                "unit value must not be negative".to_string(),
            ));
        }

        let kind_token = labels::status_token(&self.kind);
        let status_token = self.status.as_deref().and_then(labels::status_token);

        let mut movement = Movement {
            id: non_blank(self.id).unwrap_or_default(),
            date,
            date_defaulted: false,
            kind: MovementKind::from_token(kind_token.as_deref()),
            fund_id,
            project_id,
            title,
            description: text(self.description),
            unit_value: self.unit_value,
            quantity: self.quantity,
            total_value: MoneyCents::ZERO,
            status: MovementStatus::from_token(status_token.as_deref()),
            status_recorded: true,
            category: text(self.category),
            payment_method: text(self.payment_method),
            payee: text(self.payee),
            cost_center: text(self.cost_center),
            document_type: text(self.document_type),
            document_number: text(self.document_number),
            notes: text(self.notes),
            attachments: Vec::new(),
        };
        movement.recompute_total();
        Ok(movement)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(labels::normalize_display)
}

fn text(value: Option<String>) -> String {
    non_blank(value).unwrap_or_default()
}

/// Storage object path for a new attachment:
/// `movements/{movement_id}/{uuid}-{sanitised file name}`.
pub fn attachment_storage_path(movement_id: &str, file_name: &str) -> String {
    let (stem, extension) = match file_name.trim().rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name.trim(), None),
    };
    let stem = labels::normalize_key_with(stem, '-').unwrap_or_else(|| "file".to_string());
    let extension = extension
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty());

    let name = match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    };
    format!("movements/{movement_id}/{}-{name}", Uuid::new_v4())
}
