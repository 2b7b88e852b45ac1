//! `sqlx::migrate!` embeds `migrations/` at compile time; rebuild whenever a
//! migration file is added or edited.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
