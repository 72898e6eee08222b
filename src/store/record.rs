//! Client record model: one spreadsheet row per registered customer.

use serde::{Deserialize, Serialize};

/// Number of columns in a client row (A..I).
pub const COLUMN_COUNT: usize = 9;

/// Header labels written to row 1, in column order.
pub const HEADERS: [&str; COLUMN_COUNT] = [
    "Имя",
    "Фамилия",
    "Телефон",
    "Город",
    "Комментарии",
    "Telegram ID",
    "Статус",
    "Последнее обновление",
    "Комментарий к статусу",
];

/// Zero-based column indices.
pub mod col {
    pub const FIRST_NAME: usize = 0;
    pub const LAST_NAME: usize = 1;
    pub const PHONE: usize = 2;
    pub const CITY: usize = 3;
    pub const COMMENTS: usize = 4;
    pub const EXTERNAL_USER_ID: usize = 5;
    pub const STATUS: usize = 6;
    pub const LAST_UPDATED: usize = 7;
    pub const STATUS_COMMENT: usize = 8;
}

/// Shipment stage stored in the status column.
///
/// Known codes map to a fixed description; anything else is carried through
/// as `Other` so new codes typed into the sheet by hand still display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Processing,
    Shipped,
    InTransit,
    Arrived,
    ReadyForPickup,
    Delivered,
    Other(String),
}

impl OrderStatus {
    /// All known statuses, in shipment order.
    pub const KNOWN: [OrderStatus; 6] = [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::InTransit,
        OrderStatus::Arrived,
        OrderStatus::ReadyForPickup,
        OrderStatus::Delivered,
    ];

    /// Parse a stored cell value. Blank means the implicit initial status.
    pub fn from_code(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Processing;
        }
        Self::KNOWN
            .into_iter()
            .find(|s| s.code() == trimmed)
            .unwrap_or_else(|| Self::Other(trimmed.to_string()))
    }

    /// The string written to the sheet.
    pub fn code(&self) -> &str {
        match self {
            Self::Processing => "В обработке",
            Self::Shipped => "Отправлен",
            Self::InTransit => "В пути",
            Self::Arrived => "Прибыл",
            Self::ReadyForPickup => "Готов к выдаче",
            Self::Delivered => "Выдан",
            Self::Other(raw) => raw,
        }
    }

    /// User-facing description.
    pub fn description(&self) -> String {
        match self {
            Self::Processing => "🔄 Ваш заказ в обработке".to_string(),
            Self::Shipped => "📤 Ваш заказ отправлен".to_string(),
            Self::InTransit => "🚚 Ваш заказ в пути".to_string(),
            Self::Arrived => "📍 Ваш заказ прибыл в город назначения".to_string(),
            Self::ReadyForPickup => "✅ Ваш заказ готов к выдаче".to_string(),
            Self::Delivered => "🎉 Ваш заказ выдан. Спасибо, что выбрали нас!".to_string(),
            Self::Other(raw) => format!("Статус: {raw}"),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Processing
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Customer-entered fields collected by the registration wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub city: String,
    pub comments: String,
    pub external_user_id: String,
}

impl ClientRecord {
    /// Row cells for a freshly created client: initial status, no timestamp,
    /// no status comment.
    pub fn to_new_row(&self) -> Vec<String> {
        vec![
            self.first_name.clone(),
            self.last_name.clone(),
            self.phone.clone(),
            self.city.clone(),
            self.comments.clone(),
            self.external_user_id.clone(),
            OrderStatus::Processing.code().to_string(),
            String::new(),
            String::new(),
        ]
    }
}

/// Status projection of a stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub status: OrderStatus,
    pub last_updated: Option<String>,
    pub status_comment: Option<String>,
}

impl StatusView {
    pub fn from_row(row: &[String]) -> Self {
        Self {
            status: OrderStatus::from_code(cell(row, col::STATUS)),
            last_updated: non_blank(cell(row, col::LAST_UPDATED)),
            status_comment: non_blank(cell(row, col::STATUS_COMMENT)),
        }
    }
}

/// One-based sheet row number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RowPosition(pub u32);

impl RowPosition {
    /// Row number for the zero-based index of a row returned by a full-range read.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    pub fn number(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for RowPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cell at `index`, or `""` when the API trimmed trailing blanks.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn blank_status_is_processing() {
        assert_eq!(OrderStatus::from_code(""), OrderStatus::Processing);
        assert_eq!(OrderStatus::from_code("   "), OrderStatus::Processing);
    }

    #[test]
    fn known_codes_parse() {
        for status in OrderStatus::KNOWN {
            assert_eq!(OrderStatus::from_code(status.code()), status);
            assert!(status.is_known());
        }
    }

    #[test]
    fn unknown_code_passes_through() {
        let status = OrderStatus::from_code("На таможне");
        assert_eq!(status, OrderStatus::Other("На таможне".into()));
        assert_eq!(status.description(), "Статус: На таможне");
        assert!(!status.is_known());
    }

    #[test]
    fn new_row_has_initial_status_and_blank_trailers() {
        let record = ClientRecord {
            first_name: "Иван".into(),
            last_name: "Петров".into(),
            phone: "+996700000000".into(),
            city: "Бишкек".into(),
            comments: "без комментариев".into(),
            external_user_id: "42".into(),
        };
        assert_eq!(
            record.to_new_row(),
            row(&[
                "Иван",
                "Петров",
                "+996700000000",
                "Бишкек",
                "без комментариев",
                "42",
                "В обработке",
                "",
                ""
            ])
        );
    }

    #[test]
    fn short_row_reads_as_blank_cells() {
        let stored = row(&["Иван", "Петров", "+996", "Бишкек", "", "42"]);
        let view = StatusView::from_row(&stored);
        assert_eq!(view.status, OrderStatus::Processing);
        assert!(view.last_updated.is_none());
        assert!(view.status_comment.is_none());
    }

    #[test]
    fn column_indices_match_headers() {
        assert_eq!(HEADERS[col::FIRST_NAME], "Имя");
        assert_eq!(HEADERS[col::LAST_NAME], "Фамилия");
        assert_eq!(HEADERS[col::PHONE], "Телефон");
        assert_eq!(HEADERS[col::CITY], "Город");
        assert_eq!(HEADERS[col::COMMENTS], "Комментарии");
        assert_eq!(HEADERS[col::EXTERNAL_USER_ID], "Telegram ID");
        assert_eq!(HEADERS[col::STATUS_COMMENT], "Комментарий к статусу");
    }

    #[test]
    fn row_position_is_one_based() {
        assert_eq!(RowPosition::from_index(0), RowPosition(1));
        assert_eq!(RowPosition::from_index(4).number(), 5);
    }
}
