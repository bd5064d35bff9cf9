//! Canvas interaction engine for the idea board.
//!
//! A board holds two kinds of movable entities, idea nodes and sticky notes.
//! This crate owns everything between raw pointer/touch/keyboard input and
//! the remote entity store: viewport panning, entity dragging, tool modes,
//! gesture classification, selection, tag filtering, and optimistic
//! synchronization. The host UI is responsible only for wiring DOM (or
//! native) events into [`session::BoardSession`] and drawing the
//! [`render::Scene`] it produces.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Synchronous interaction core ([`engine::EngineCore`]) and its [`engine::Action`] output |
//! | [`session`] | Sync layer: runs remote calls and applies their outcomes |
//! | [`doc`] | Entity types and the client-side [`doc::EntityStore`] |
//! | [`camera`] | Viewport pan offset and coordinate conversions |
//! | [`input`] | Tools, selection, and the gesture state machine types |
//! | [`editor`] | Draft state for the node edit modal |
//! | [`filter`] | Tag filter and node search |
//! | [`render`] | Scene projection and the relation-line overlay |
//! | [`api`] | Remote store traits |
//! | [`http`] | HTTP implementation of the remote store traits |
//! | [`config`] | Environment-driven configuration |
//! | [`error`] | Error taxonomy |
//! | [`consts`] | Gesture thresholds and entity defaults |

pub mod api;
pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod editor;
pub mod engine;
pub mod error;
pub mod filter;
pub mod http;
pub mod input;
pub mod render;
pub mod session;
