//! `YYYY-MM-DD` serde adapters for `time::Date`.

use crate::calendar::{format_date, parse_local_date};
use serde::{Deserialize, Deserializer, Serializer};
use time::Date;

pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(*date))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_local_date(&raw).map_err(|err| serde::de::Error::custom(err.message()))
}

pub mod option {
    use super::{format_date, parse_local_date};
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_local_date(&raw)
                .map(Some)
                .map_err(|err| serde::de::Error::custom(err.message())),
            None => Ok(None),
        }
    }
}
