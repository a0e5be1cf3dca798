//! CSV loader for recorded page sessions.
//!
//! A session is a timeline of things that happened on an auction page and
//! in the settings panel. Replaying it drives a live synchronizer.
//!
//! ## CSV Format
//!
//! | Column  | Required | Type    | Notes                                        |
//! |---------|----------|---------|----------------------------------------------|
//! | `at_ms` | yes      | integer | Milliseconds since the page loaded, ascending |
//! | `event` | yes      | string  | See the event table below                    |
//! | `value` | no       | string  | Event argument; leave empty when unused      |
//!
//! ### Events
//!
//! | Event      | Value                         | Meaning                                 |
//! |------------|-------------------------------|-----------------------------------------|
//! | `bid`      | bid text, e.g. `$12.50`       | Bid element text changes (empty removes it) |
//! | `mutate`   | none                          | Unrelated DOM change                    |
//! | `navigate` | URL                           | Client-side navigation to another item  |
//! | `popstate` | URL                           | Back/forward navigation                 |
//! | `focus`    | none                          | Window regains focus                    |
//! | `hidden`   | none                          | Tab hidden                              |
//! | `visible`  | none                          | Tab visible again                       |
//! | `close`    | none                          | Overlay close button clicked            |
//! | `settings` | `premium;lot_fee;tax`         | Settings saved from the panel           |
//! | `toggle`   | `on` / `off`                  | Panel visibility toggle                 |
//! | `details`  | none                          | Panel asks for price details            |
//!
//! ### Example
//!
//! ```csv
//! at_ms,event,value
//! 0,bid,$100.00
//! 500,bid,$110.00
//! 900,settings,12.5;3.00;7
//! 1200,details,
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CsvRow {
    at_ms: u64,
    event: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// New bid text; `None` when the bid element disappears.
    Bid(Option<String>),
    Mutate,
    Navigate(String),
    PopState(String),
    Focus,
    Hidden,
    Visible,
    Close,
    /// Raw form input, validated by the settings panel on replay.
    Settings {
        buyers_premium_rate: String,
        lot_fee: String,
        sales_tax_rate: String,
    },
    Toggle(bool),
    Details,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStep {
    pub at: Duration,
    pub event: SessionEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("cannot read session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown event '{event}' on row {row}")]
    UnknownEvent { event: String, row: usize },

    #[error("event '{event}' on row {row} needs a value")]
    MissingValue { event: &'static str, row: usize },

    #[error("invalid value '{value}' for '{event}' on row {row}")]
    InvalidValue {
        event: &'static str,
        value: String,
        row: usize,
    },

    /// Timestamps must not go backwards.
    #[error("row {row} is earlier than the row before it")]
    OutOfOrder { row: usize },
}

fn required(
    event: &'static str,
    value: Option<String>,
    row: usize,
) -> Result<String, SessionError> {
    value.ok_or(SessionError::MissingValue { event, row })
}

/// Convert a single CSV row. `row` is 1-based (for error messages).
fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<SessionStep, SessionError> {
    let value = row.value.filter(|v| !v.is_empty());
    let event = match row.event.as_str() {
        "bid" => SessionEvent::Bid(value),
        "mutate" => SessionEvent::Mutate,
        "navigate" => SessionEvent::Navigate(required("navigate", value, row_number)?),
        "popstate" => SessionEvent::PopState(required("popstate", value, row_number)?),
        "focus" => SessionEvent::Focus,
        "hidden" => SessionEvent::Hidden,
        "visible" => SessionEvent::Visible,
        "close" => SessionEvent::Close,
        "settings" => {
            let raw = required("settings", value, row_number)?;
            let parts: Vec<&str> = raw.split(';').map(str::trim).collect();
            let [premium, lot_fee, tax] = parts.as_slice() else {
                return Err(SessionError::InvalidValue {
                    event: "settings",
                    value: raw.clone(),
                    row: row_number,
                });
            };
            SessionEvent::Settings {
                buyers_premium_rate: premium.to_string(),
                lot_fee: lot_fee.to_string(),
                sales_tax_rate: tax.to_string(),
            }
        }
        "toggle" => match required("toggle", value, row_number)?.as_str() {
            "on" | "true" => SessionEvent::Toggle(true),
            "off" | "false" => SessionEvent::Toggle(false),
            other => {
                return Err(SessionError::InvalidValue {
                    event: "toggle",
                    value: other.to_string(),
                    row: row_number,
                });
            }
        },
        "details" => SessionEvent::Details,
        _ => {
            return Err(SessionError::UnknownEvent {
                event: row.event,
                row: row_number,
            });
        }
    };

    Ok(SessionStep {
        at: Duration::from_millis(row.at_ms),
        event,
    })
}

/// Parse CSV text and return the steps in file order.
///
/// # Errors
///
/// * [SessionError::Parse]: the CSV is structurally invalid.
/// * [SessionError::UnknownEvent], [SessionError::MissingValue],
///   [SessionError::InvalidValue]: a row does not describe a valid event.
/// * [SessionError::OutOfOrder]: timestamps go backwards.
pub fn load_from_str(input: &str) -> Result<Vec<SessionStep>, SessionError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true) // a trailing empty `value` column may be omitted
        .from_reader(input.as_bytes());

    let mut steps: Vec<SessionStep> = Vec::new();
    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = idx + 1;
        let step = convert_row(result?, row_number)?;
        if steps.last().is_some_and(|last| step.at < last.at) {
            return Err(SessionError::OutOfOrder { row: row_number });
        }
        steps.push(step);
    }
    Ok(steps)
}

/// Read a session file from disk and delegate to [load_from_str].
pub fn load_from_file(path: &Path) -> Result<Vec<SessionStep>, SessionError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}
