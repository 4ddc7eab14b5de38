//! Bundled tools: a clock and a birthday lookup.

use super::ToolHandler;
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Returns the current local date and time. Takes no parameters.
pub struct CurrentDateTimeTool {
    clock: Clock,
}

impl CurrentDateTimeTool {
    pub const NAME: &'static str = "GetCurrentDateTime";

    pub fn new() -> Self {
        Self::with_clock(|| Local::now().naive_local())
    }

    pub fn with_clock(clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }
}

impl Default for CurrentDateTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for CurrentDateTimeTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Returns the current local date and time."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _parameters: Value) -> String {
        (self.clock)().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct BirthdayParams {
    /// Date to look up, formatted as YYYY-MM-DD.
    birthday: String,
}

/// Looks up who has a birthday on a given date.
pub struct BirthdayLookupTool {
    birthdays: Vec<(NaiveDate, String)>,
    schema: Value,
}

impl BirthdayLookupTool {
    pub const NAME: &'static str = "GetBirthdays";

    pub fn new() -> Self {
        let known = [
            ((2024, 1, 1), "Kay"),
            ((2024, 3, 10), "Lucy"),
            ((2024, 3, 10), "Nina"),
        ];
        Self::with_birthdays(known.into_iter().filter_map(|((y, m, d), name)| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| (date, name.to_string()))
        }))
    }

    pub fn with_birthdays(birthdays: impl IntoIterator<Item = (NaiveDate, String)>) -> Self {
        let mut schema = serde_json::to_value(schemars::schema_for!(BirthdayParams))
            .unwrap_or_else(|_| json!({"type": "object"}));
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        Self {
            birthdays: birthdays.into_iter().collect(),
            schema,
        }
    }
}

impl Default for BirthdayLookupTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for BirthdayLookupTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Returns the names of people whose birthday falls on the given date."
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn invoke(&self, parameters: Value) -> String {
        let Ok(params) = serde_json::from_value::<BirthdayParams>(parameters) else {
            return "Missing required parameter: birthday.".to_string();
        };
        let raw = params.birthday;
        let date = match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => return format!("Invalid date \"{}\": expected YYYY-MM-DD.", raw),
        };

        let names: Vec<&str> = self
            .birthdays
            .iter()
            .filter(|(d, _)| *d == date)
            .map(|(_, name)| name.as_str())
            .collect();

        if names.is_empty() {
            format!("No known birthdays on {}.", date)
        } else {
            format!("People with a birthday on {}: {}.", date, names.join(", "))
        }
    }
}
