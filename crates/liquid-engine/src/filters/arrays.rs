//! Array filters. `size`, `first` and `last` also accept strings.

use super::string_arg;
use super::string_input;
use super::FilterRegistry;
use crate::error::FilterError;
use crate::value::Value;

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.insert_builtin("first", first);
    registry.insert_builtin("last", last);
    registry.insert_builtin("join", join);
    registry.insert_builtin("size", size);
    registry.insert_builtin("sort", sort);
    registry.insert_builtin("reverse", reverse);
    registry.insert_builtin("uniq", uniq);
    registry.insert_builtin("map", map);
    registry.insert_builtin("where", where_);
}

/// Require an array input, passing nil through untouched (a missing
/// variable piped into an array filter is not an error).
fn array_input<'v>(filter: &str, input: &'v Value) -> Result<Option<&'v Vec<Value>>, FilterError> {
    match input {
        Value::Array(items) => Ok(Some(items)),
        Value::Nil => Ok(None),
        other => Err(FilterError::invalid_input(
            filter,
            format!("expected an array, got {}", other.type_name()),
        )),
    }
}

fn first(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(match input {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Nil),
        Value::String(s) => s
            .chars()
            .next()
            .map_or(Value::Nil, |c| Value::String(c.to_string())),
        _ => Value::Nil,
    })
}

fn last(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(match input {
        Value::Array(items) => items.last().cloned().unwrap_or(Value::Nil),
        Value::String(s) => s
            .chars()
            .next_back()
            .map_or(Value::Nil, |c| Value::String(c.to_string())),
        _ => Value::Nil,
    })
}

fn join(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let Some(items) = array_input("join", input)? else {
        return Ok(Value::Nil);
    };
    let separator = args.first().map_or_else(|| " ".to_string(), string_input);
    let joined = items
        .iter()
        .map(Value::to_output_string)
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::String(joined))
}

fn size(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let n = input.size().unwrap_or(0);
    Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

/// Sort ascending; with a property argument, sort objects by that
/// property. Incomparable pairs keep their relative order.
fn sort(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let Some(items) = array_input("sort", input)? else {
        return Ok(Value::Nil);
    };
    let mut sorted = items.clone();
    if args.is_empty() {
        sorted.sort_by(|a, b| a.compare(b).unwrap_or(std::cmp::Ordering::Equal));
    } else {
        let property = string_arg("sort", args, 0)?;
        sorted.sort_by(|a, b| {
            let a = property_of(a, &property);
            let b = property_of(b, &property);
            a.compare(&b).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    Ok(Value::Array(sorted))
}

fn reverse(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let Some(items) = array_input("reverse", input)? else {
        return Ok(Value::Nil);
    };
    let mut reversed = items.clone();
    reversed.reverse();
    Ok(Value::Array(reversed))
}

fn uniq(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let Some(items) = array_input("uniq", input)? else {
        return Ok(Value::Nil);
    };
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(item) {
            unique.push(item.clone());
        }
    }
    Ok(Value::Array(unique))
}

/// Project each element to one of its properties.
fn map(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let Some(items) = array_input("map", input)? else {
        return Ok(Value::Nil);
    };
    let property = string_arg("map", args, 0)?;
    Ok(Value::Array(
        items.iter().map(|item| property_of(item, &property)).collect(),
    ))
}

/// Keep elements whose property equals the given value, or is truthy
/// when no value is given.
fn where_(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let Some(items) = array_input("where", input)? else {
        return Ok(Value::Nil);
    };
    let property = string_arg("where", args, 0)?;
    let expected = args.get(1);

    let kept = items
        .iter()
        .filter(|item| {
            let actual = property_of(item, &property);
            match expected {
                Some(expected) => actual.loose_eq(expected),
                None => actual.is_truthy(),
            }
        })
        .cloned()
        .collect();
    Ok(Value::Array(kept))
}

fn property_of(value: &Value, property: &str) -> Value {
    match value {
        Value::Object(map) => map.get(property).cloned().unwrap_or(Value::Nil),
        _ => Value::Nil,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn arr(items: Vec<i64>) -> Value {
        Value::from(items)
    }

    fn objects() -> Value {
        Value::from(serde_json::json!([
            { "name": "b", "ok": true },
            { "name": "a", "ok": false },
            { "name": "c", "ok": true },
        ]))
    }

    #[test]
    fn first_and_last() {
        assert_eq!(first(&arr(vec![1, 2, 3]), &[]).unwrap(), Value::Int(1));
        assert_eq!(last(&arr(vec![1, 2, 3]), &[]).unwrap(), Value::Int(3));
        assert_eq!(first(&Value::from("héllo"), &[]).unwrap(), Value::from("h"));
        assert_eq!(first(&Value::Array(vec![]), &[]).unwrap(), Value::Nil);
    }

    #[test]
    fn join_with_and_without_separator() {
        let input = Value::from(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(join(&input, &[]).unwrap(), Value::from("a b"));
        assert_eq!(
            join(&input, &[Value::from(", ")]).unwrap(),
            Value::from("a, b")
        );
    }

    #[test]
    fn size_of_strings_and_arrays() {
        assert_eq!(size(&arr(vec![1, 2, 3]), &[]).unwrap(), Value::Int(3));
        assert_eq!(size(&Value::from("héllo"), &[]).unwrap(), Value::Int(5));
        assert_eq!(size(&Value::Nil, &[]).unwrap(), Value::Int(0));
    }

    #[test]
    fn sort_numbers_and_strings() {
        assert_eq!(sort(&arr(vec![3, 1, 2]), &[]).unwrap(), arr(vec![1, 2, 3]));
        let strings = Value::from(vec![Value::from("pear"), Value::from("apple")]);
        assert_eq!(
            sort(&strings, &[]).unwrap(),
            Value::from(vec![Value::from("apple"), Value::from("pear")])
        );
    }

    #[test]
    fn sort_by_property() {
        let sorted = sort(&objects(), &[Value::from("name")]).unwrap();
        let Value::Array(items) = sorted else { panic!() };
        let names: Vec<Value> = items
            .iter()
            .map(|o| property_of(o, "name"))
            .collect();
        assert_eq!(
            names,
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
    }

    #[test]
    fn reverse_reverses() {
        assert_eq!(reverse(&arr(vec![1, 2, 3]), &[]).unwrap(), arr(vec![3, 2, 1]));
    }

    #[test]
    fn uniq_keeps_first_occurrence() {
        assert_eq!(
            uniq(&arr(vec![1, 2, 1, 3, 2]), &[]).unwrap(),
            arr(vec![1, 2, 3])
        );
    }

    #[test]
    fn map_projects_properties() {
        assert_eq!(
            map(&objects(), &[Value::from("name")]).unwrap(),
            Value::from(vec![Value::from("b"), Value::from("a"), Value::from("c")])
        );
    }

    #[test]
    fn where_filters_by_property() {
        let kept = where_(&objects(), &[Value::from("ok")]).unwrap();
        let Value::Array(items) = kept else { panic!() };
        assert_eq!(items.len(), 2);

        let kept = where_(&objects(), &[Value::from("name"), Value::from("a")]).unwrap();
        let Value::Array(items) = kept else { panic!() };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn non_array_input_is_an_error() {
        assert!(matches!(
            join(&Value::Int(1), &[]),
            Err(FilterError::InvalidInput { .. })
        ));
    }

    #[test]
    fn nil_passes_through() {
        assert_eq!(sort(&Value::Nil, &[]).unwrap(), Value::Nil);
    }
}
