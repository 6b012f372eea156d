use readalong_core::error::ReadAlongError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), ReadAlongError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
