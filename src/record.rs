//! Turns raw dump lines into [`Author`] and [`Book`] records.
//!
//! Dump lines look like `/type/author\t/authors/OL1A\t2\t2008-09-08T03:23:05.850541\t{...}`.
//! Everything before the first `{` is ignored and the rest is read as a JSON
//! object. Extraction is tolerant: absent or `null` fields become empty values.
//! Once an author line parses as an object it always yields an author; a work
//! field of the wrong shape fails the line.

use crate::config::{AUTHOR_KEY_PREFIX, WORK_KEY_PREFIX};
use crate::error::{RecordError, RecordResult};
use crate::models::{Author, Book};
use serde_json::{Map, Number, Value};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

type JsonObject = Map<String, Value>;

/// Returns the slice starting at the first `{` of the line.
pub fn json_payload(line: &[u8]) -> RecordResult<&[u8]> {
    memchr::memchr(b'{', line)
        .map(|start| &line[start..])
        .ok_or(RecordError::MissingObject)
}

fn parse_object(line: &[u8]) -> RecordResult<JsonObject> {
    Ok(serde_json::from_slice(json_payload(line)?)?)
}

pub fn parse_author(line: &[u8]) -> RecordResult<Author> {
    let obj = parse_object(line)?;

    Ok(Author {
        id: strip_namespace(&lenient_string(&obj, "key"), AUTHOR_KEY_PREFIX),
        name: lenient_string(&obj, "name"),
        personal_name: lenient_string(&obj, "personal_name"),
    })
}

/// Parses a work line. `author_names` is left empty; filling it is the resolver's job.
pub fn parse_work(line: &[u8]) -> RecordResult<Book> {
    let obj = parse_object(line)?;

    let description = match opt_object(&obj, "description") {
        Some(desc) => Some(opt_string(desc, "value")?),
        None => None,
    };

    let published_date = match opt_object(&obj, "created") {
        Some(created) => match created.get("value") {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) => Some(parse_timestamp(value)?),
            Some(_) => {
                return Err(RecordError::TypeMismatch {
                    field: "created.value",
                    expected: "a timestamp string",
                })
            }
        },
        None => None,
    };

    Ok(Book {
        id: strip_namespace(&opt_string(&obj, "key")?, WORK_KEY_PREFIX),
        name: opt_string(&obj, "title")?,
        description,
        published_date,
        cover_ids: cover_ids(&obj)?,
        author_ids: author_ids(&obj)?,
        author_names: Vec::new(),
    })
}

/// Parses `yyyy-MM-ddTHH:mm:ss.ffffff` and keeps the calendar date.
pub fn parse_timestamp(value: &str) -> RecordResult<Date> {
    let format =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]");

    PrimitiveDateTime::parse(value, format)
        .map(|timestamp| timestamp.date())
        .map_err(|source| RecordError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// Drops the namespace prefix from a key. Keys without the prefix are kept whole.
pub fn strip_namespace(key: &str, prefix: &str) -> String {
    key.strip_prefix(prefix).unwrap_or(key).to_string()
}

fn cover_ids(obj: &JsonObject) -> RecordResult<Vec<String>> {
    let Some(covers) = obj.get("covers").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    covers
        .iter()
        .map(|cover| {
            scalar_to_string(cover).ok_or(RecordError::TypeMismatch {
                field: "covers",
                expected: "an array of scalar ids",
            })
        })
        .collect()
}

fn author_ids(obj: &JsonObject) -> RecordResult<Vec<String>> {
    let Some(roles) = obj.get("authors").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    roles
        .iter()
        .map(|role| {
            role.get("author")
                .and_then(|author| author.get("key"))
                .and_then(Value::as_str)
                .map(|key| strip_namespace(key, AUTHOR_KEY_PREFIX))
                .ok_or(RecordError::TypeMismatch {
                    field: "authors",
                    expected: "entries with a string `author.key`",
                })
        })
        .collect()
}

fn opt_object<'a>(obj: &'a JsonObject, field: &str) -> Option<&'a JsonObject> {
    obj.get(field).and_then(Value::as_object)
}

fn opt_string(obj: &JsonObject, field: &'static str) -> RecordResult<String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => scalar_to_string(value).ok_or(RecordError::TypeMismatch {
            field,
            expected: "a string",
        }),
    }
}

/// Never fails: objects and arrays are kept as their JSON text.
fn lenient_string(obj: &JsonObject, field: &str) -> String {
    match obj.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(value) => scalar_to_string(value).unwrap_or_else(|| value.to_string()),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_string(n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        itoa::Buffer::new().format(i).to_string()
    } else if let Some(u) = n.as_u64() {
        itoa::Buffer::new().format(u).to_string()
    } else {
        n.to_string()
    }
}
