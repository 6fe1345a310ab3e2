use std::fs::File;

use earthcube::{Outcome, Params, Processor, Result, Settings};

/// Demo driver: runs the standard product requests against the local
/// scene store and writes the plots next to the working directory.
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings::load()?;
    let processor = Processor::new(&settings.path.data_dir);

    println!("earthcube - data-cube product demo\n");

    // rejection shape, no bounds supplied
    let mut sink = Vec::new();
    let outcome = processor.execute(
        &params(&[("selection", "line"), ("type", "ndvi_transect")]),
        &mut sink,
    )?;
    println!("no-bounds request: {:?}\n", outcome);

    let base = [
        ("xmin", "-4.037846435"),
        ("ymin", "52.51647802"),
        ("xmax", "-3.970512503"),
        ("ymax", "52.56521060"),
        ("time_begin", "2018-2-1"),
        ("time_end", "2018-6-1"),
    ];

    let requests = [
        ("rectangle", "ndvi_time_series", "test_ndvi_time_series.jpg"),
        ("rectangle", "ndvi_std_dev", "test_ndvi_std_dev.jpg"),
        ("rectangle", "time_series", "test_time_series.jpg"),
        ("rectangle", "colour_infrared", "test_colour_infrared.jpg"),
        ("line", "ndvi_transect", "test_ndvi_transect.jpg"),
    ];

    for (selection, kind, file_name) in requests {
        let mut pairs = vec![("selection", selection), ("type", kind)];
        pairs.extend_from_slice(&base);

        let mut out = File::create(file_name)?;
        match processor.execute(&params(&pairs), &mut out)? {
            Outcome::Plot(summary) => {
                println!("Saved {} ({} bytes, {})", file_name, summary.size, summary.mimetype)
            }
            Outcome::Rejected(msg) => println!("{}: {}", kind, msg),
        }
    }

    Ok(())
}

fn params(pairs: &[(&str, &str)]) -> Params {
    Params::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
}
