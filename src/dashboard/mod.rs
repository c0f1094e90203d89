//! Web2App Studio admin back-end.
//!
//! ## Overview
//!
//! A GitHub repository is the catalog database. Templates, categories and
//! icons are JSON and PNG files read and written through the GitHub Contents
//! API, so every admin edit is a commit. Admins sign in with GitHub OAuth and
//! act with their own token; the public read API uses a server token.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │ (admin / │ <─────── │    ├─ public.rs  (catalog reads, icon proxy)     │
//! │ desktop) │          │    ├─ auth.rs    (OAuth login, session extractor)│
//! └──────────┘          │    └─ api.rs     (admin CRUD, AppState, errors)  │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  catalog.rs  (manifest / template / category /   │
//!                       │               icon operations)                   │
//!                       │  icons.rs    (favicon discovery, batch routine)  │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  store.rs    (ContentStore, IdentityProvider)    │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  github.rs   (reqwest Contents API + OAuth)      │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                             |
//! |------------|------------------------------------------------------------|
//! | `models`   | Catalog documents: `Template`, `Category`, `Manifest`      |
//! | `session`  | `AdminSession` cookie codec and OAuth state cookie         |
//!
//! ## Typical Request Flow (create a template)
//!
//! 1. `POST /api/admin/templates` → the `AdminSession` extractor decodes the
//!    session cookie (401 if missing or expired).
//! 2. `api::create_template` validates required fields, normalizes the id and
//!    stamps `metadata.lastUpdated`.
//! 3. `catalog::save_template` writes `templates/<category>/<id>.json`;
//!    `GitHubClient::put_file` looks up the current SHA first so an existing
//!    file is overwritten.
//! 4. `catalog::update_template_counts` re-lists every category and commits a
//!    new `manifest.json`.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod github;
pub mod icons;
pub mod models;
pub mod public;
pub mod server;
pub mod session;
pub mod store;
