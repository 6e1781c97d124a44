#![no_main]

use libfuzzer_sys::fuzz_target;

use bytespool::stringfs::StringFs;

// Feeds arbitrary bytes to the image decoder. Decoding may fail, but a
// decoded image must survive a full walk plus reads of every file it lists
// without panicking or looping.
fuzz_target!(|data: &[u8]| {
    let Ok(packed) = StringFs::decode(data) else {
        return;
    };

    let mut paths = Vec::new();
    let _ = packed.walk("/", |path, file| {
        if !file.is_dir() {
            paths.push(path.to_string());
        }
    });

    for path in paths {
        if let Ok(file) = packed.open(&path) {
            if let Ok(contents) = file.contents() {
                assert_eq!(contents.len() as u64, file.len());
            }
        }
    }
});
