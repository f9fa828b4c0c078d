use std::{env::args, error::Error, fs::File, io::BufReader};

use fsverity_digest::{compute_digest, MerkleTreeParams};

// #[cfg(target_os = "linux")]
// use fsverity_digest::linux::fsverity_measure;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    for arg in args().skip(1) {
        let file = File::open(&arg)?;
        let params = MerkleTreeParams {
            file_size: file.metadata()?.len(),
            ..Default::default()
        };
        let digest = compute_digest(BufReader::new(file), &params)?;
        println!("{} {}", digest, &arg);

        // For comparison with the native value
        // #[cfg(target_os = "linux")]
        // {
        //     let digest = fsverity_measure(File::open(&arg)?)?;
        //     println!("{} {}", digest, &arg);
        // }
    }

    Ok(())
}
