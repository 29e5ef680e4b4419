pub mod admin;
pub mod gate;
pub mod health;
pub mod session;

#[cfg(test)]
mod tests;
