#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use wled_ws_card::socket::Endpoint;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn plain_and_secure() {
	let plain = Endpoint { secure: false, host: "homeassistant.local:8123".to_owned() };
	assert_eq!(plain.url("abc123"), "ws://homeassistant.local:8123/api/wled_ws/abc123");

	let secure = Endpoint { secure: true, host: "ha.example.com".to_owned() };
	assert_eq!(secure.url("default"), "wss://ha.example.com/api/wled_ws/default");
}

#[wasm_bindgen_test]
fn target_is_one_path_segment() {
	let endpoint = Endpoint { secure: false, host: "ha.local".to_owned() };
	assert_eq!(endpoint.url("a b/c?d"), "ws://ha.local/api/wled_ws/a%20b%2Fc%3Fd");
}

#[wasm_bindgen_test]
fn page_origin() {
	let location = web_sys::window().unwrap().location();
	let endpoint = Endpoint::current().unwrap();
	assert_eq!(endpoint.secure, location.protocol().unwrap() == "https:");
	assert_eq!(endpoint.host, location.host().unwrap());
}
