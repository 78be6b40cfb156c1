//! Light Lab: an interactive configurator for lighting and resin material
//! previews. The scene state, derived guidance, presets and render capture
//! live here; `app` is the desktop front-end over them.

pub mod app;
pub mod assets;
pub mod likes;
pub mod presets;
pub mod render;
pub mod scene;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;
