//! Validation of transaction and budget limit input before anything is persisted.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{
    Date, OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339,
    macros::format_description,
};

use crate::{category::CategoryName, transaction::TransactionType};

/// The max number of characters allowed in a transaction description.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// The input field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// The transaction description.
    Description,
    /// Whether the transaction is income or an expense.
    Type,
    /// The transaction or limit category.
    Category,
    /// The transaction date.
    Date,
    /// The transaction amount.
    Amount,
    /// The budget limit value.
    Limit,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Description => "description",
            Field::Type => "type",
            Field::Category => "category",
            Field::Date => "date",
            Field::Amount => "amount",
            Field::Limit => "limit",
        };

        f.write_str(name)
    }
}

/// Input that was rejected, along with the field responsible.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// The offending field.
    pub field: Field,
    /// A message that can be shown to the client.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    pub fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_owned(),
        }
    }
}

/// The raw request body for creating a transaction.
///
/// Every field is optional and accepts any JSON value so that a missing field,
/// or one of the wrong JSON type, is reported as a [ValidationError] naming
/// that field rather than a generic parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionInput {
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: Option<Value>,
    /// Either "income" or "expense".
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
    /// The category label.
    #[serde(default)]
    pub category: Option<Value>,
    /// An RFC 3339 date-time or a `YYYY-MM-DD` date.
    #[serde(default)]
    pub date: Option<Value>,
    /// The value of the transaction in dollars, as a JSON number or a string.
    #[serde(default)]
    pub amount: Option<Value>,
}

/// A transaction that passed validation and can be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransaction {
    /// Trimmed description.
    pub description: String,
    /// Income or expense.
    pub kind: TransactionType,
    /// Normalized category.
    pub category: CategoryName,
    /// When the transaction happened, in UTC.
    pub date: OffsetDateTime,
    /// Positive amount.
    pub amount: Decimal,
}

/// The raw request body for setting a budget limit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitInput {
    /// The category label.
    #[serde(default)]
    pub category: Option<Value>,
    /// The maximum intended spend for the category, as a JSON number or a string.
    #[serde(default)]
    pub limit: Option<Value>,
}

/// Validate a transaction against the current time `now`.
///
/// Fields are checked in the order description, type, category, date, amount
/// and the first failure is returned.
///
/// # Errors
/// Returns a [ValidationError] naming the first invalid field.
pub fn validate_transaction(
    input: TransactionInput,
    now: OffsetDateTime,
) -> Result<ValidatedTransaction, ValidationError> {
    let description = validate_description(input.description.as_ref())?;
    let kind = validate_type(input.kind.as_ref())?;
    let category = validate_category(input.category.as_ref())?;
    let date = validate_date(input.date.as_ref(), now)?;
    let amount = validate_positive(input.amount.as_ref(), Field::Amount)?;

    Ok(ValidatedTransaction {
        description,
        kind,
        category,
        date,
        amount,
    })
}

/// Validate the category and value of a budget limit.
///
/// # Errors
/// Returns a [ValidationError] for [Field::Category] or [Field::Limit].
pub fn validate_limit(
    category: Option<&Value>,
    limit: Option<&Value>,
) -> Result<(CategoryName, Decimal), ValidationError> {
    let category = validate_category(category)?;
    let limit = validate_positive(limit, Field::Limit)?;

    Ok((category, limit))
}

/// Read a field that should be a JSON string.
///
/// Missing and `null` fields read as empty so the caller reports them as required.
fn text_field<'a>(
    value: Option<&'a Value>,
    field: Field,
    message: &str,
) -> Result<&'a str, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(_) => Err(ValidationError::new(field, message)),
    }
}

fn validate_description(description: Option<&Value>) -> Result<String, ValidationError> {
    let description =
        text_field(description, Field::Description, "Description must be text")?.trim();

    if description.is_empty() {
        return Err(ValidationError::new(
            Field::Description,
            "Description is required",
        ));
    }

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::new(
            Field::Description,
            "Description cannot exceed 500 characters",
        ));
    }

    Ok(description.to_owned())
}

fn validate_type(kind: Option<&Value>) -> Result<TransactionType, ValidationError> {
    const MESSAGE: &str = "Type must be either \"income\" or \"expense\"";

    let kind = text_field(kind, Field::Type, MESSAGE)?.trim();

    if kind.is_empty() {
        return Err(ValidationError::new(Field::Type, "Type is required"));
    }

    TransactionType::from_str(&kind.to_lowercase())
        .map_err(|_| ValidationError::new(Field::Type, MESSAGE))
}

fn validate_category(category: Option<&Value>) -> Result<CategoryName, ValidationError> {
    CategoryName::new(text_field(category, Field::Category, "Category must be text")?)
}

fn validate_date(
    date: Option<&Value>,
    now: OffsetDateTime,
) -> Result<OffsetDateTime, ValidationError> {
    let date = text_field(date, Field::Date, "Date must be valid")?.trim();

    if date.is_empty() {
        return Err(ValidationError::new(Field::Date, "Date is required"));
    }

    let parsed = parse_date(date)
        .ok_or_else(|| ValidationError::new(Field::Date, "Date must be valid"))?;

    if parsed > now {
        return Err(ValidationError::new(
            Field::Date,
            "Date cannot be in the future",
        ));
    }

    Ok(parsed)
}

/// Parse an RFC 3339 date-time, or a plain date which is taken as midnight UTC.
fn parse_date(text: &str) -> Option<OffsetDateTime> {
    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(date_time.to_offset(UtcOffset::UTC));
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

fn validate_positive(value: Option<&Value>, field: Field) -> Result<Decimal, ValidationError> {
    let message = match field {
        Field::Limit => "Limit must be a positive number",
        _ => "Amount must be a positive number",
    };

    // JSON numbers are read back from their shortest decimal form, so `0.1`
    // becomes exactly one tenth rather than the nearest binary float.
    let number = match value {
        Some(Value::Number(number)) => parse_decimal(&number.to_string()),
        Some(Value::String(text)) => parse_decimal(text.trim()),
        _ => None,
    };

    match number {
        Some(number) if number > Decimal::ZERO => Ok(number),
        _ => Err(ValidationError::new(field, message)),
    }
}

/// Parse plain (`12.30`) or scientific (`1.5e3`) decimal notation.
fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        category::CategoryName,
        transaction::TransactionType,
        validation::{
            Field, LimitInput, TransactionInput, ValidationError, validate_limit,
            validate_transaction,
        },
    };

    const NOW: OffsetDateTime = datetime!(2025-06-15 12:00 UTC);

    fn valid_input() -> TransactionInput {
        TransactionInput {
            description: Some(json!("  Weekly shop ")),
            kind: Some(json!("expense")),
            category: Some(json!(" Groceries ")),
            date: Some(json!("2025-06-14")),
            amount: Some(json!(42.5)),
        }
    }

    #[track_caller]
    fn assert_field(result: Result<impl std::fmt::Debug, ValidationError>, want: Field) {
        match result {
            Err(error) => assert_eq!(error.field, want, "got error {error}"),
            Ok(value) => panic!("want validation error for {want}, got {value:?}"),
        }
    }

    #[test]
    fn valid_input_is_normalized() {
        let validated = validate_transaction(valid_input(), NOW).unwrap();

        assert_eq!(validated.description, "Weekly shop");
        assert_eq!(validated.kind, TransactionType::Expense);
        assert_eq!(validated.category, CategoryName::new("groceries").unwrap());
        assert_eq!(validated.date, datetime!(2025-06-14 0:00 UTC));
        assert_eq!(validated.amount, dec!(42.5));
    }

    #[test]
    fn accepts_rfc3339_and_converts_to_utc() {
        let input = TransactionInput {
            date: Some(json!("2025-06-15T13:30:00+12:00")),
            ..valid_input()
        };

        let validated = validate_transaction(input, NOW).unwrap();

        assert_eq!(validated.date, datetime!(2025-06-15 1:30 UTC));
    }

    #[test]
    fn accepts_date_equal_to_now() {
        let input = TransactionInput {
            date: Some(json!("2025-06-15T12:00:00Z")),
            ..valid_input()
        };

        assert!(validate_transaction(input, NOW).is_ok());
    }

    #[test]
    fn accepts_amount_as_string_and_mixed_case_type() {
        let input = TransactionInput {
            kind: Some(json!(" Income ")),
            amount: Some(json!(" 12.30 ")),
            ..valid_input()
        };

        let validated = validate_transaction(input, NOW).unwrap();

        assert_eq!(validated.kind, TransactionType::Income);
        assert_eq!(validated.amount, dec!(12.3));
    }

    #[test]
    fn json_numbers_keep_their_decimal_value() {
        for (amount, want) in [
            (json!(0.1), dec!(0.1)),
            (json!(0.7), dec!(0.7)),
            (json!(19.99), dec!(19.99)),
            (json!(5), dec!(5)),
            (json!(1.5e3), dec!(1500)),
            (json!("2.5e2"), dec!(250)),
        ] {
            let input = TransactionInput {
                amount: Some(amount.clone()),
                ..valid_input()
            };

            let validated = validate_transaction(input, NOW).unwrap();

            assert_eq!(validated.amount, want, "amount {amount}");
        }
    }

    #[test]
    fn rejects_empty_description() {
        let input = TransactionInput {
            description: Some(json!("   ")),
            ..valid_input()
        };

        assert_field(validate_transaction(input, NOW), Field::Description);
    }

    #[test]
    fn rejects_long_description() {
        let input = TransactionInput {
            description: Some(Value::String("x".repeat(501))),
            ..valid_input()
        };

        assert_field(validate_transaction(input, NOW), Field::Description);
    }

    #[test]
    fn rejects_invalid_type() {
        let input = TransactionInput {
            kind: Some(json!("transfer")),
            ..valid_input()
        };

        assert_field(validate_transaction(input, NOW), Field::Type);
    }

    #[test]
    fn rejects_missing_type() {
        let input = TransactionInput {
            kind: None,
            ..valid_input()
        };

        assert_field(validate_transaction(input, NOW), Field::Type);
    }

    #[test]
    fn null_is_treated_as_missing() {
        let input = TransactionInput {
            category: Some(Value::Null),
            ..valid_input()
        };

        let error = validate_transaction(input, NOW).unwrap_err();

        assert_eq!(error.field, Field::Category);
        assert_eq!(error.message, "Category is required");
    }

    #[test]
    fn rejects_missing_category() {
        let input = TransactionInput {
            category: None,
            ..valid_input()
        };

        assert_field(validate_transaction(input, NOW), Field::Category);
    }

    #[test]
    fn rejects_future_date() {
        let input = TransactionInput {
            date: Some(json!("2025-06-15T12:00:01Z")),
            ..valid_input()
        };

        let error = validate_transaction(input, NOW).unwrap_err();

        assert_eq!(error.field, Field::Date);
        assert_eq!(error.message, "Date cannot be in the future");
    }

    #[test]
    fn rejects_unparseable_date() {
        let input = TransactionInput {
            date: Some(json!("15/06/2025")),
            ..valid_input()
        };

        assert_field(validate_transaction(input, NOW), Field::Date);
    }

    #[test]
    fn rejects_non_positive_and_non_numeric_amounts() {
        for amount in [
            json!(0),
            json!(-5.0),
            json!("NaN"),
            json!("inf"),
            json!("twelve"),
            json!(""),
        ] {
            let input = TransactionInput {
                amount: Some(amount),
                ..valid_input()
            };

            assert_field(validate_transaction(input, NOW), Field::Amount);
        }
    }

    #[test]
    fn rejects_fields_of_the_wrong_json_type() {
        let cases = [
            (
                TransactionInput {
                    description: Some(json!(5)),
                    ..valid_input()
                },
                Field::Description,
                "Description must be text",
            ),
            (
                TransactionInput {
                    kind: Some(json!(["expense"])),
                    ..valid_input()
                },
                Field::Type,
                "Type must be either \"income\" or \"expense\"",
            ),
            (
                TransactionInput {
                    category: Some(json!({ "name": "groceries" })),
                    ..valid_input()
                },
                Field::Category,
                "Category must be text",
            ),
            (
                TransactionInput {
                    date: Some(json!(20250614)),
                    ..valid_input()
                },
                Field::Date,
                "Date must be valid",
            ),
            (
                TransactionInput {
                    amount: Some(json!(true)),
                    ..valid_input()
                },
                Field::Amount,
                "Amount must be a positive number",
            ),
        ];

        for (input, want_field, want_message) in cases {
            let error = validate_transaction(input, NOW).unwrap_err();

            assert_eq!(error.field, want_field);
            assert_eq!(error.message, want_message);
        }
    }

    #[test]
    fn body_with_wrong_json_types_still_deserializes() {
        let body = json!({
            "description": 5,
            "type": false,
            "category": [],
            "date": {},
            "amount": true,
        });

        let input: TransactionInput = serde_json::from_value(body).unwrap();

        assert_field(validate_transaction(input, NOW), Field::Description);
    }

    #[test]
    fn reports_first_invalid_field() {
        let input = TransactionInput::default();

        assert_field(validate_transaction(input, NOW), Field::Description);
    }

    #[test]
    fn limit_must_be_positive() {
        let result = validate_limit(Some(&json!("dining")), Some(&json!(0)));

        assert_field(result, Field::Limit);
    }

    #[test]
    fn limit_of_the_wrong_json_type_names_limit() {
        let input: LimitInput =
            serde_json::from_value(json!({ "category": "dining", "limit": true })).unwrap();

        let result = validate_limit(input.category.as_ref(), input.limit.as_ref());

        assert_field(result, Field::Limit);
    }

    #[test]
    fn limit_category_is_normalized() {
        let (category, limit) = validate_limit(Some(&json!(" Dining ")), Some(&json!(0.8))).unwrap();

        assert_eq!(category.as_ref(), "dining");
        assert_eq!(limit, dec!(0.8));
    }
}
