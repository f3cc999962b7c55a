use serde::{de, Deserialize, Deserializer, Serializer};

pub fn from_i64_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse::<i64>().map_err(|error| {
        de::Error::invalid_value(
            de::Unexpected::Str(&format!("unexpected value: {}, error: {}", s, error)),
            &"a number as string e.g. \"1700000000\", which fits within i64",
        )
    })
}

pub fn to_i64_string<S>(num_i64: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&num_i64.to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

/// Explorers disagree on whether numbers are sent as JSON numbers or as decimal strings, accept
/// both.
pub fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(num) => Ok(num),
        StringOrNumber::String(s) => s.trim().parse::<u64>().map_err(|error| {
            de::Error::invalid_value(
                de::Unexpected::Str(&format!("unexpected value: {}, error: {}", s, error)),
                &"a number or a number as string e.g. \"4181309\", which fits within u64",
            )
        }),
    }
}
