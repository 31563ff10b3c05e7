pub mod train_advance;
pub mod turnstile_entry;
