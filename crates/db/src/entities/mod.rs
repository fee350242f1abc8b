//! `SeaORM` entity definitions.

pub mod diary_entries;
