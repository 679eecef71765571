//! Example: Build a three-band raster, edit it with numpy-style keys and
//! inspect the chunk storage
//!
//! Run with: RUST_LOG=rasterband=debug cargo run --example raster_bands

use ndarray::{Array2, Ix2, Ix3};
use rasterband::{
    Band, BandConfig, BandIndexer, CompressedBand, CompressionMethod, Key, SliceSpec, Value,
};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();

    println!("rasterband example: three-band raster");
    println!("=====================================\n");

    let size = (500, 700);
    let config = BandConfig::from_json(
        r#"{ "chunk_size": { "rows": 128, "cols": 128 }, "compression": "Zstd", "cache_chunks": 16 }"#,
    )?;
    println!("Band config: {}", config.to_json()?);

    // A smooth red band, a constant green band and an empty blue band
    let red = Array2::from_shape_fn(size, |(r, c)| ((r + c) % 256) as u8);
    let bands: Vec<Box<dyn Band<u8>>> = vec![
        Box::new(CompressedBand::from_array(red.view(), config.clone())?),
        Box::new(CompressedBand::with_fill(size, config.clone(), 200)?),
        Box::new(CompressedBand::new(size, config.with_compression(CompressionMethod::Deflate))?),
    ];
    let mut raster = BandIndexer::new(bands)?;
    println!("Raster shape: {:?} ({})\n", raster.shape(), raster.dtype());

    // Paint a square into every band at once
    let square: Key = "100:164, 300:364".parse()?;
    raster.set(
        &square,
        Value::Bands(vec![Value::Scalar(255), Value::Scalar(0), Value::Scalar(128)]),
    )?;

    // Flip the blue band's top rows upside down
    let top = Key::region(SliceSpec::range(0, 64), SliceSpec::full());
    let flipped = Key::region(SliceSpec::new(Some(63), None, Some(-1)), SliceSpec::full());
    let blue = raster.band(2).map(|b| b.get(&flipped)).transpose()?;
    if let (Some(blue), Some(band)) = (blue, raster.band_mut(2)) {
        band.set(&top, Value::Array(blue.into_array()))?;
    }

    // Read back a downsampled preview of all three bands
    let preview = raster
        .get(&Key::region(SliceSpec::step(50), SliceSpec::step(50)))?
        .into_dimensionality::<Ix3>()?;
    println!("Preview shape: {:?}", preview.dim());

    let pixel = raster.get(&Key::cell(120, 320))?;
    println!("Pixel (120, 320): {:?}", pixel.into_array().iter().collect::<Vec<_>>());

    // Bright red cells, selected with a mask
    let red_band = raster
        .band(0)
        .map(|b| b.get(&Key::all()))
        .transpose()?
        .map(|s| s.into_dimensionality::<Ix2>())
        .transpose()?;
    if let Some(red_band) = red_band {
        let bright = Key::Mask(red_band.mapv(|v| v > 250));
        let hits = raster.get(&bright)?;
        println!("Bright red cells: {:?} (cells x bands)", hits.shape());
    }

    let first_row = raster.rows().next().transpose()?;
    if let Some(row) = first_row {
        println!("First row: {:?} (bands x cols)\n", row.dim());
    }

    println!("Storage:");
    for band in raster.into_bands() {
        println!("  {:?} {:?}", band.dtype(), band.size());
    }

    // Chunk-level statistics are on the concrete type
    let mut band = CompressedBand::<u8>::new(size, BandConfig::default().with_chunk_size((128, 128)))?;
    band.set(&square, Value::Scalar(1))?;
    let stats = band.stats();
    println!("\nSingle band after one write: {}", stats.summary());

    Ok(())
}
