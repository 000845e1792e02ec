//! Handler return values and the policy that writes them to the response.
//!
//! # Default Policy
//! - No values: nothing is written
//! - One value: written as the body
//! - Two or more values with an integer first: status, then the second value
//!   as the body
//! - `Box<T>` / `Arc<T>` are dereferenced once when converted
//! - Bytes are written verbatim, anything else as its text form

use axum::body::Bytes;
use axum::http::StatusCode;
use std::borrow::Cow;
use std::sync::Arc;

use crate::dispatch::Context;
use crate::error::Fault;
use crate::http::ResponseWriter;

/// One value returned by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnValue {
    Int(i64),
    Text(String),
    Bytes(Bytes),
}

impl ReturnValue {
    /// Body bytes for this value.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            ReturnValue::Int(n) => Bytes::from(n.to_string()),
            ReturnValue::Text(s) => Bytes::from(s.clone()),
            ReturnValue::Bytes(b) => b.clone(),
        }
    }
}

/// The ordered values a handler returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnValues(Vec<ReturnValue>);

impl ReturnValues {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&ReturnValue> {
        self.0.first()
    }

    pub fn get(&self, index: usize) -> Option<&ReturnValue> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReturnValue> {
        self.0.iter()
    }
}

impl From<Vec<ReturnValue>> for ReturnValues {
    fn from(values: Vec<ReturnValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<ReturnValue> for ReturnValues {
    fn from_iter<I: IntoIterator<Item = ReturnValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ReturnValues {
    type Item = ReturnValue;
    type IntoIter = std::vec::IntoIter<ReturnValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Conversion of a single returned value.
pub trait IntoReturnValue {
    fn into_return_value(self) -> ReturnValue;
}

macro_rules! impl_int_return {
    ($($ty:ty),*) => {
        $(
            impl IntoReturnValue for $ty {
                fn into_return_value(self) -> ReturnValue {
                    ReturnValue::Int(i64::from(self))
                }
            }
        )*
    };
}

impl_int_return!(i8, i16, i32, i64, u8, u16, u32);

impl IntoReturnValue for usize {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Int(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl IntoReturnValue for StatusCode {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Int(i64::from(self.as_u16()))
    }
}

impl IntoReturnValue for String {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Text(self)
    }
}

impl IntoReturnValue for &'static str {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Text(self.to_string())
    }
}

impl IntoReturnValue for Cow<'static, str> {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Text(self.into_owned())
    }
}

impl IntoReturnValue for Vec<u8> {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Bytes(Bytes::from(self))
    }
}

impl IntoReturnValue for &'static [u8] {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Bytes(Bytes::from_static(self))
    }
}

impl IntoReturnValue for Bytes {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Bytes(self)
    }
}

impl IntoReturnValue for serde_json::Value {
    fn into_return_value(self) -> ReturnValue {
        ReturnValue::Text(self.to_string())
    }
}

impl<T: IntoReturnValue> IntoReturnValue for Box<T> {
    fn into_return_value(self) -> ReturnValue {
        (*self).into_return_value()
    }
}

impl<T: IntoReturnValue + Clone> IntoReturnValue for Arc<T> {
    fn into_return_value(self) -> ReturnValue {
        T::clone(&self).into_return_value()
    }
}

/// Conversion of a handler's whole result.
pub trait IntoReturnValues {
    fn into_return_values(self) -> Result<ReturnValues, Fault>;
}

impl IntoReturnValues for () {
    fn into_return_values(self) -> Result<ReturnValues, Fault> {
        Ok(ReturnValues::new())
    }
}

impl<T: IntoReturnValue> IntoReturnValues for T {
    fn into_return_values(self) -> Result<ReturnValues, Fault> {
        Ok(ReturnValues(vec![self.into_return_value()]))
    }
}

impl<A: IntoReturnValue, B: IntoReturnValue> IntoReturnValues for (A, B) {
    fn into_return_values(self) -> Result<ReturnValues, Fault> {
        Ok(ReturnValues(vec![
            self.0.into_return_value(),
            self.1.into_return_value(),
        ]))
    }
}

impl<A, B, C> IntoReturnValues for (A, B, C)
where
    A: IntoReturnValue,
    B: IntoReturnValue,
    C: IntoReturnValue,
{
    fn into_return_values(self) -> Result<ReturnValues, Fault> {
        Ok(ReturnValues(vec![
            self.0.into_return_value(),
            self.1.into_return_value(),
            self.2.into_return_value(),
        ]))
    }
}

/// An `Err` fails the request.
impl<R, E> IntoReturnValues for Result<R, E>
where
    R: IntoReturnValues,
    E: Into<Fault>,
{
    fn into_return_values(self) -> Result<ReturnValues, Fault> {
        self.map_err(Into::into)?.into_return_values()
    }
}

/// Translates a handler's return values into output on the response.
///
/// Resolved from the request container as `Arc<dyn ReturnHandler>` after
/// every handler, so an application can replace the policy with
/// `map_to::<dyn ReturnHandler>`.
pub trait ReturnHandler: Send + Sync {
    fn handle(&self, ctx: &Context, values: ReturnValues) -> Result<(), Fault>;
}

/// The default return policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultReturnHandler;

impl ReturnHandler for DefaultReturnHandler {
    fn handle(&self, ctx: &Context, values: ReturnValues) -> Result<(), Fault> {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return Ok(());
        };

        let res = ctx.get::<dyn ResponseWriter>()?;
        let body = match (first, values.next()) {
            (ReturnValue::Int(code), Some(second)) => {
                res.write_header(status_from(code)?);
                second
            }
            (first, _) => first,
        };
        res.write(&body.to_bytes());
        Ok(())
    }
}

fn status_from(code: i64) -> Result<StatusCode, Fault> {
    u16::try_from(code)
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .ok_or(Fault::InvalidStatus(code))
}
