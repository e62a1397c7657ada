#![no_main]

use libfuzzer_sys::fuzz_target;
use pescope::{Image, ParseConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = Image::from_mem_with_config(data.to_vec(), ParseConfig::lenient()) {
        for import in image.imports() {
            for thunk in import.symbols() {
                let _ = image.hint_name(thunk);
            }
        }
        for section in image.sections() {
            let _ = image.section_data(section);
        }
    }
});
