use clap::Parser;
use snobal_core::core_types::constants::{FREEZE, STEF_BOLTZ};
use snobal_core::core_types::{Celsius, Kelvin, PointMeteorology, Precipitation, SnowState};
use snobal_core::physics::sati;
use snobal_core::{BatchInputs, CellRecord, GridDriver, ModelParams, TimestepConfig};
use std::error::Error;
use std::f64::consts::PI;
use tracing_subscriber::EnvFilter;

/// Snowpack energy-balance demo driven by synthetic diurnal forcing
#[derive(Parser, Debug)]
#[command(name = "snobal-demo")]
#[command(about = "Two-layer snowpack energy balance over an elevation transect", long_about = None)]
struct Args {
    /// Simulation length in days
    #[arg(short, long, default_value_t = 5)]
    days: u32,

    /// Number of cells along the transect
    #[arg(short, long, default_value_t = 16)]
    cells: usize,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    workers: usize,

    /// Elevation of the lowest cell in meters
    #[arg(long, default_value_t = 1500.0)]
    low_elevation: f64,

    /// Elevation of the highest cell in meters
    #[arg(long, default_value_t = 3000.0)]
    high_elevation: f64,

    /// Mean air temperature at the lowest cell in °C
    #[arg(short, long, default_value_t = -2.0)]
    temperature: f64,

    /// Diurnal air temperature amplitude in °C
    #[arg(long, default_value_t = 6.0)]
    amplitude: f64,

    /// Relative humidity in %
    #[arg(long, default_value_t = 70.0)]
    humidity: f64,

    /// Wind speed in m/s
    #[arg(short = 'u', long, default_value_t = 3.0)]
    wind_speed: f64,

    /// Peak net shortwave radiation at noon in W/m²
    #[arg(long, default_value_t = 350.0)]
    solar_peak: f64,

    /// Initial snow depth in meters
    #[arg(long, default_value_t = 1.0)]
    depth: f64,

    /// Initial snow density in kg/m³
    #[arg(long, default_value_t = 300.0)]
    density: f64,

    /// Precipitation falling each evening at 18:00 in kg/m²
    #[arg(long, default_value_t = 0.0)]
    snowfall: f64,

    /// Report interval in hours
    #[arg(short, long, default_value_t = 24)]
    report_interval: u32,

    /// Print per-cell state at the end
    #[arg(short, long)]
    verbose: bool,
}

const LAPSE_RATE: f64 = 0.0065;
const AIR_EMISSIVITY: f64 = 0.75;

/// Forcing for one cell at one hour of the run
fn forcing(args: &Args, hour: u32, elevation: f64) -> Result<PointMeteorology, Box<dyn Error>> {
    let hour_of_day = f64::from(hour % 24);
    let lapse = LAPSE_RATE * (elevation - args.low_elevation);

    // Warmest at 15:00
    let t_air = f64::from(
        Celsius::new(
            args.temperature - lapse
                + args.amplitude * (2.0 * PI * (hour_of_day - 9.0) / 24.0).sin(),
        )
        .to_kelvin(),
    );

    let s_n = if (6.0..=18.0).contains(&hour_of_day) {
        args.solar_peak * (PI * (hour_of_day - 6.0) / 12.0).sin()
    } else {
        0.0
    };

    Ok(PointMeteorology {
        i_lw: AIR_EMISSIVITY * STEF_BOLTZ * t_air.powi(4),
        t_a: t_air,
        e_a: args.humidity / 100.0 * sati(t_air)?,
        u: args.wind_speed,
        t_g: FREEZE - 1.0,
        s_n,
    })
}

fn precipitation(args: &Args, hour: u32) -> Precipitation {
    if args.snowfall > 0.0 && hour % 24 == 18 {
        Precipitation {
            m_pp: args.snowfall,
            percent_snow: 1.0,
            rho_snow: 100.0,
            t_pp: FREEZE - 3.0,
        }
    } else {
        Precipitation::default()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    println!("=== Snowpack Energy Balance Demo ===\n");

    let driver = GridDriver::new(
        ModelParams::default(),
        TimestepConfig::default(),
        args.workers,
    )?;

    let span = (args.high_elevation - args.low_elevation) / (args.cells.max(2) - 1) as f64;
    let mut records: Vec<CellRecord> = (0..args.cells)
        .map(|i| CellRecord {
            masked: true,
            elevation: args.low_elevation + span * i as f64,
            state: SnowState {
                z_0: 0.005,
                z_s: args.depth,
                rho: args.density,
                t_s_0: FREEZE - 5.0,
                t_s: FREEZE - 6.0,
                ..SnowState::default()
            },
            ..CellRecord::default()
        })
        .collect();

    println!(
        "Transect: {} cells from {:.0} m to {:.0} m",
        args.cells, args.low_elevation, args.high_elevation
    );
    println!(
        "Initial pack: {:.2} m at {:.0} kg/m³ ({:.1} kg/m²)",
        args.depth,
        args.density,
        args.depth * args.density
    );
    println!(
        "Forcing: {:.1}°C ± {:.1}°C, RH {:.0}%, wind {:.1} m/s, solar peak {:.0} W/m²\n",
        args.temperature, args.amplitude, args.humidity, args.wind_speed, args.solar_peak
    );

    println!("Running simulation...\n");
    println!("Hour | Snow cells | Mean SWE(kg/m²) | Mean depth(m) | Melt(kg/m²) | Runoff(kg/m²) | Failures");
    println!("-----|------------|-----------------|---------------|-------------|---------------|---------");

    let mut total_melt = 0.0;
    let mut total_runoff = 0.0;
    let mut total_failures = 0;

    for hour in 0..args.days * 24 {
        let input1 = records
            .iter()
            .map(|r| forcing(&args, hour, r.elevation))
            .collect::<Result<Vec<_>, _>>()?;
        let input2 = records
            .iter()
            .map(|r| forcing(&args, hour + 1, r.elevation))
            .collect::<Result<Vec<_>, _>>()?;
        let precip = vec![precipitation(&args, hour); records.len()];

        let report = driver.run_batch(
            &mut records,
            &BatchInputs {
                input1: &input1,
                input2: &input2,
                precip: &precip,
            },
            hour == 0,
        )?;

        total_failures += report.failures.len();
        total_melt += records.iter().map(|r| r.sums.melt_sum).sum::<f64>() / records.len() as f64;
        total_runoff +=
            records.iter().map(|r| r.sums.ro_pred_sum).sum::<f64>() / records.len() as f64;

        if (hour + 1) % args.report_interval.max(1) == 0 {
            let snow_cells = records.iter().filter(|r| r.state.layer_count > 0).count();
            let n = records.len() as f64;
            println!(
                "{:4} | {:10} | {:15.1} | {:13.3} | {:11.2} | {:13.2} | {:8}",
                hour + 1,
                snow_cells,
                records.iter().map(|r| r.state.m_s).sum::<f64>() / n,
                records.iter().map(|r| r.state.z_s).sum::<f64>() / n,
                total_melt,
                total_runoff,
                total_failures,
            );
        }
    }

    println!("\n=== Simulation Complete ===");
    println!("Total melt (transect mean): {:.2} kg/m²", total_melt);
    println!("Total runoff (transect mean): {:.2} kg/m²", total_runoff);
    println!("Cell failures: {}", total_failures);

    if args.verbose {
        println!("\nElevation(m) | Layers | SWE(kg/m²) | Depth(m) | T_surface(°C) | Liquid(kg/m²)");
        println!("-------------|--------|------------|----------|---------------|--------------");
        for r in &records {
            println!(
                "{:12.0} | {:6} | {:10.1} | {:8.3} | {:13.2} | {:12.2}",
                r.elevation,
                r.state.layer_count,
                r.state.m_s,
                r.state.z_s,
                *Kelvin::new(r.state.t_s_0).to_celsius(),
                r.state.h2o,
            );
        }
    }

    Ok(())
}
