//! Property-based tests for the validator
//!
//! Tests invariants:
//! - The reported failure is the first one in check order
//! - Supplying a missing required field never surfaces an earlier failure

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use crate::core::trip::{check, validate, ValidationError};

/// State of one field in a generated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Absent,
    Valid,
    WrongType,
}

fn arb_field() -> impl Strategy<Value = Field> {
    prop_oneof![Just(Field::Absent), Just(Field::Valid), Just(Field::WrongType)]
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    trip_config: Field,
    days: Field,
    flights: Field,
    palette: Field,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    (arb_field(), arb_field(), arb_field(), arb_field()).prop_map(
        |(trip_config, days, flights, palette)| Shape {
            trip_config,
            days,
            flights,
            palette,
        },
    )
}

fn build(shape: Shape) -> Value {
    let mut obj = Map::new();
    let mut put = |key: &str, field: Field, valid: Value, wrong: Value| match field {
        Field::Absent => {}
        Field::Valid => {
            obj.insert(key.to_string(), valid);
        }
        Field::WrongType => {
            obj.insert(key.to_string(), wrong);
        }
    };
    put("tripConfig", shape.trip_config, json!({ "title": "t" }), json!("t"));
    put("days", shape.days, json!([]), json!({}));
    put("flights", shape.flights, json!([]), json!(3));
    put("palette", shape.palette, json!({}), json!([]));
    Value::Object(obj)
}

fn expected(shape: Shape) -> Option<ValidationError> {
    if shape.trip_config != Field::Valid {
        Some(ValidationError::TripConfig)
    } else if shape.days != Field::Valid {
        Some(ValidationError::Days)
    } else if shape.flights == Field::WrongType {
        Some(ValidationError::Flights)
    } else if shape.palette == Field::WrongType {
        Some(ValidationError::Palette)
    } else {
        None
    }
}

fn rank(result: &Result<(), ValidationError>) -> usize {
    match result {
        Err(ValidationError::NotAnObject) => 0,
        Err(ValidationError::TripConfig) => 1,
        Err(ValidationError::Days) => 2,
        Err(ValidationError::Flights) => 3,
        Err(ValidationError::Palette) => 4,
        Ok(()) => 5,
    }
}

proptest! {
    #[test]
    fn prop_first_failure_is_reported(shape in arb_shape()) {
        let candidate = build(shape);
        prop_assert_eq!(check(&candidate).err(), expected(shape));
        prop_assert_eq!(validate(&candidate).is_valid(), expected(shape).is_none());
    }

    #[test]
    fn prop_fixing_required_fields_only_moves_forward(shape in arb_shape()) {
        let before = check(&build(shape));

        let mut fixed = shape;
        if fixed.trip_config == Field::Absent {
            fixed.trip_config = Field::Valid;
        }
        if fixed.days == Field::Absent {
            fixed.days = Field::Valid;
        }
        let after = check(&build(fixed));

        prop_assert!(rank(&after) >= rank(&before), "{:?} -> {:?}", before, after);
    }

    #[test]
    fn prop_non_objects_fail_first(value in prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        ".{0,8}".prop_map(Value::String),
        Just(json!([])),
    ]) {
        prop_assert_eq!(check(&value), Err(ValidationError::NotAnObject));
    }
}
