//! Built-in entity schemas.

use crate::core::DataType;
use crate::schema::constraint::Constraint;
use crate::schema::derive::Derivation;
use crate::schema::record::{FieldSpec, IdSpec, RecordSchema};

/// Patient records: vitals plus the BMI ratio and its verdict band.
pub fn patient_schema() -> RecordSchema {
    RecordSchema {
        entity: "patient",
        id: IdSpec::new("id", r"^P\d{3}$"),
        fields: vec![
            FieldSpec::new("name", DataType::Text).constrain(Constraint::NonEmpty),
            FieldSpec::new("city", DataType::Text).constrain(Constraint::NonEmpty),
            FieldSpec::new("age", DataType::Integer).constrain(Constraint::IntRange {
                gt: Some(1),
                lt: Some(100),
            }),
            FieldSpec::new("gender", DataType::Text)
                .constrain(Constraint::OneOf(vec!["Male", "Female", "Others"])),
            // Height in metres; strictly positive so the BMI derivation can
            // never divide by zero.
            FieldSpec::new("height", DataType::Float).constrain(Constraint::FloatRange {
                gt: Some(0.0),
                lt: None,
            }),
            FieldSpec::new("weight", DataType::Float).constrain(Constraint::FloatRange {
                gt: Some(0.0),
                lt: None,
            }),
        ],
        derivations: vec![
            Derivation::RatioOverSquare {
                name: "bmi",
                numerator: "weight",
                denominator: "height",
                precision: 2,
            },
            Derivation::ThresholdBands {
                name: "verdict",
                source: "bmi",
                bounds: vec![18.5, 25.0, 30.0],
                labels: vec!["Underweight", "Normal", "Overweight", "Obese"],
            },
        ],
        sortable: vec!["name", "age", "height", "weight", "bmi"],
        searchable: vec!["name", "city"],
    }
}

/// Employee records with privacy and display projections.
pub fn employee_schema() -> RecordSchema {
    RecordSchema {
        entity: "employee",
        id: IdSpec::new("id", r"^E\d{3}$"),
        fields: vec![
            FieldSpec::new("name", DataType::Text).constrain(Constraint::NonEmpty),
            FieldSpec::new("email", DataType::Text).constrain(Constraint::Email),
            FieldSpec::new("department", DataType::Text).constrain(Constraint::NonEmpty),
            FieldSpec::new("date_joined", DataType::Text).constrain(Constraint::IsoDate),
            FieldSpec::new("salary", DataType::Float).constrain(Constraint::FloatRange {
                gt: Some(0.0),
                lt: None,
            }),
        ],
        derivations: vec![
            Derivation::Uppercase {
                name: "name_upper",
                source: "name",
            },
            Derivation::MaskedEmail {
                name: "email_masked",
                source: "email",
            },
            Derivation::Reversed {
                name: "name_reversed",
                source: "name",
            },
            Derivation::TitleCase {
                name: "department_title",
                source: "department",
            },
            Derivation::ReformatDate {
                name: "date_joined_formatted",
                source: "date_joined",
                format: "%d-%m-%Y",
            },
            Derivation::CurrencyPrefix {
                name: "salary_with_currency",
                source: "salary",
                symbol: "₹",
            },
        ],
        sortable: vec!["name", "department", "salary", "date_joined"],
        searchable: vec!["name", "email", "department"],
    }
}

/// Bookstore inventory; the ISBN is the identifier. No derivations — a
/// schema may declare none.
pub fn book_schema() -> RecordSchema {
    RecordSchema {
        entity: "book",
        id: IdSpec::new("isbn", r"^978-\d{10}-\d$"),
        fields: vec![
            FieldSpec::new("title", DataType::Text).constrain(Constraint::NonEmpty),
            FieldSpec::new("author", DataType::Text).constrain(Constraint::NonEmpty),
            FieldSpec::new("programming_language", DataType::Text)
                .optional()
                .nullable()
                .constrain(Constraint::NonEmpty),
            FieldSpec::new("publisher", DataType::Text).constrain(Constraint::NonEmpty),
            FieldSpec::new("price", DataType::Float).constrain(Constraint::FloatRange {
                gt: Some(0.0),
                lt: None,
            }),
            FieldSpec::new("publication_year", DataType::Integer).constrain(
                Constraint::IntRange {
                    gt: Some(1899),
                    lt: Some(2101),
                },
            ),
        ],
        derivations: vec![],
        sortable: vec!["title", "price", "publication_year"],
        searchable: vec!["title", "author"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_patterns_match_expected_shapes() {
        assert!(patient_schema().check_id("P001").is_ok());
        assert!(patient_schema().check_id("P1234").is_err());
        assert!(employee_schema().check_id("E042").is_ok());
        assert!(employee_schema().check_id("P042").is_err());
        assert!(book_schema().check_id("978-0134685991-3").is_ok());
        assert!(book_schema().check_id("978-013468599-3").is_err());
    }

    #[test]
    fn sortable_lists_cover_derived_fields() {
        let schema = patient_schema();
        assert!(schema.sortable.contains(&"bmi"));
        assert_eq!(schema.field_type("bmi"), Some(DataType::Float));
        assert_eq!(schema.field_type("verdict"), Some(DataType::Text));
        assert_eq!(schema.field_type("no_such_field"), None);
    }
}
