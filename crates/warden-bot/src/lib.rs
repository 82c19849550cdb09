// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user serialized update pipeline for the Warden approval bot.
//!
//! The [`Dispatcher`] is the central coordinator. For each incoming update
//! it materializes the sender, takes the sender's lease from the
//! [`LockRegistry`], runs the first matching route from the [`RouteTable`],
//! commits the conversational state and hands the response to the
//! [`Renderer`](render::Renderer). Admin notifications are queued and fanned
//! out by the [`AdminNotifier`] worker.

pub mod dispatcher;
pub mod handler;
pub mod handlers;
pub mod locks;
pub mod messages;
pub mod notify;
pub mod render;
pub mod routes;
pub mod shutdown;
pub mod workflow;

pub use dispatcher::Dispatcher;
pub use handler::{AdminSet, Call, Deps, Handler, Reply, Settings, Stores};
pub use locks::{Lease, LockRegistry};
pub use notify::{AdminNotifier, FanOut, NotifyEvent, NotifyQueue};
pub use routes::{Matcher, RouteTable};
