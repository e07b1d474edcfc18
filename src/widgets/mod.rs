//! This module contains user interface components which are reused between
//! different parts of the user interface.

pub mod alert;
pub mod stat_card;
