use readalong_core::error::ReadAlongError;
use readalong_core::model::ReaderSettings;

use crate::output;

pub fn run() -> Result<(), ReadAlongError> {
    output::json::print(&ReaderSettings::default())
}
