use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum Error {
	/// The host assigned no configuration object at all.
	#[error("wled-ws-card: Invalid configuration")]
	InvalidConfiguration,

	#[error("wled-ws-card: malformed configuration: {0}")]
	Json(#[from] serde_json::Error),

	/// A browser API call failed. The rejected value is kept in its debug representation.
	#[error("wled-ws-card: {0}")]
	Js(String),
}

impl Error {
	pub(crate) fn js(value: &JsValue) -> Self {
		Self::Js(format!("{:?}", value))
	}
}

impl From<JsValue> for Error {
	fn from(value: JsValue) -> Self {
		Self::js(&value)
	}
}

impl From<Error> for JsValue {
	fn from(error: Error) -> Self {
		js_sys::Error::new(&error.to_string()).into()
	}
}
