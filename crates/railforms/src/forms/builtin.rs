//! Built-in form kinds.
//!
//! These are the maintenance forms the workshop currently files. Every
//! measurement is recorded as free text exactly as written on the sheet
//! (e.g. `"915 (900-1000)"`), so only the check dates are typed.

use super::schema::{FieldType, FormSchema};

/// Kind name of the wheel specification form.
pub const WHEEL_SPECIFICATION: &str = "wheel-specification";

/// Kind name of the bogie checksheet form.
pub const BOGIE_CHECKSHEET: &str = "bogie-checksheet";

/// Wheel and axle dimension limits for a coach.
#[must_use]
pub fn wheel_specification() -> FormSchema {
    [
        "treadDiameterNew",
        "lastShopIssueSize",
        "condemningDia",
        "wheelGauge",
        "variationSameAxle",
        "variationSameBogie",
        "variationSameCoach",
        "wheelProfile",
        "intermediateWWP",
        "bearingSeatDiameter",
        "rollerBearingOuterDia",
        "rollerBearingBoreDia",
        "rollerBearingWidth",
        "axleBoxHousingBoreDia",
        "wheelDiscWidth",
    ]
    .into_iter()
    .fold(
        FormSchema::new(WHEEL_SPECIFICATION, "Wheel Specification"),
        |schema, name| schema.required(name, FieldType::Text),
    )
    .optional("additionalProp1", FieldType::Object)
}

/// Periodic bogie inspection.
#[must_use]
pub fn bogie_checksheet() -> FormSchema {
    FormSchema::new(BOGIE_CHECKSHEET, "Bogie Checksheet")
        .required("bogieType", FieldType::Text)
        .required("lastCheckDate", FieldType::Date)
        .required("defectFound", FieldType::Text)
        .required("repairedBy", FieldType::Text)
        .required("nextCheckDueDate", FieldType::Date)
        .required("brakeSystemStatus", FieldType::Text)
        .required("suspensionCondition", FieldType::Text)
        .optional("additionalNotes", FieldType::Text)
        .optional("additionalProp1", FieldType::Object)
}

/// All built-in schemas, in registration order.
#[must_use]
pub fn builtin_schemas() -> Vec<FormSchema> {
    vec![wheel_specification(), bogie_checksheet()]
}
