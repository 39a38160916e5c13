#![doc(html_root_url = "https://docs.rs/wled-ws-card/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A Home Assistant dashboard card that paints a WLED live view as a CSS gradient.
//!
//! The page loads the generated Wasm module once; [`init::start`] then defines the
//! `wled-ws-card` and `wled-ws-card-editor` custom elements and announces the card
//! to the dashboard's card picker.
//!
//! The card connects to `ws(s)://<host>/api/wled_ws/<entry id>` as soon as it is scrolled
//! into view, and applies every received colour-stop list as its background.

pub use lignin;

pub mod action;
pub mod card;
pub mod config;
pub mod dom;
pub mod editor;
mod element;
pub mod error;
pub mod gesture;
pub mod init;
pub mod liveview;
mod rc_hash_map;
pub mod render;
pub mod resolve;
pub mod socket;
pub mod states;
pub mod transport;
pub mod update;
pub mod visibility;

pub use error::Error;
