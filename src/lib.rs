//! # Avatar Studio
//!
//! A profile-picture editor. The user opens the selector, takes an image from
//! one of three sources (an uploaded file, a camera snapshot, or a generated
//! avatar), crops it to a square, and the result is kept in a local
//! key/value store that survives restarts.
//!
//! # Architecture: One Orchestrator
//!
//! The [`editor::Editor`] is the only component that talks to the others. It
//! receives user intents as [`editor::EditorEvent`]s and drives the rest:
//!
//! ```text
//!                       ┌──────────▶ capture   (camera session, frames)
//!                       ├──────────▶ avatars   (seeded batch)
//! EditorEvent ──▶ editor┼──────────▶ imaging   (decode, crop → PNG)
//!                       ├──────────▶ crop      (zoom / offset → region)
//!                       └──────────▶ store     (one data-URI slot)
//! ```
//!
//! Nothing calls back into the editor. Collaborators arrive as injected
//! values (codec, key/value store, capture device, translator), so the whole
//! state machine runs in tests against in-memory fakes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`editor`] | State machine: transitions, recovery, notices |
//! | [`imaging`] | Codec trait + `image`-crate backend, crop geometry, data URIs |
//! | [`capture`] | Camera devices and exclusive capture sessions |
//! | [`avatars`] | Procedural avatars in three styles, reproducible from a seed |
//! | [`crop`] | Square crop stage: zoom and offset, always in bounds |
//! | [`store`] | Key/value stores (directory, memory) and the avatar slot |
//! | [`locale`] | UI text in es / en / de with raw-key fallback |
//! | [`config`] | `config.toml` loading, validation, merging |
//! | [`types`] | `AvatarImage`, uploaded files, decode sources |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Data URIs at Rest
//!
//! The stored avatar is a single `data:<mime>;base64,…` string. It is
//! self-describing (format travels with the bytes), fits any string slot,
//! and is exactly what a browser would keep in local storage, so a store
//! written here can be moved there and back.
//!
//! ## PNG for Everything the Editor Encodes
//!
//! Camera frames, crops and generated avatars are encoded as PNG: lossless,
//! so a crop is the only transformation applied to the pixels. Uploads keep
//! their original encoding until they are cropped.
//!
//! ## Recovery, Not Propagation
//!
//! Pipeline failures (non-image file, undecodable bytes, missing camera,
//! full storage) never leave the editor in a half-finished state. It falls
//! back to the nearest stable state and queues a translated notice before
//! returning the error. A full store still updates the in-memory avatar.

pub mod avatars;
pub mod capture;
pub mod config;
pub mod crop;
pub mod editor;
pub mod imaging;
pub mod locale;
pub mod output;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
