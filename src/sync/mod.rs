//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了多层缓存的并发协调机制。

pub mod single_flight;
