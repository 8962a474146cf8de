use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::DomainConfig;
use crate::error::{Result, SimulationError};
use crate::sph::{Hydrodynamics, Kernel, NeighborProvider, SampledState};
use crate::units::*;

/// `prtl` + time × 1e6 zero padded to ten digits.
pub fn snapshot_file_name(time: Real) -> String {
    format!("prtl{:010}.dat", (time * 1.0e6) as i64)
}

pub fn states_file_name(time: Real) -> String {
    format!("states{}.dat", (time * 1.0e6) as i64)
}

pub fn averages_file_name(time: Real) -> String {
    format!("averages{}.dat", (time * 1.0e6) as i64)
}

fn create(path: &Path) -> Result<BufWriter<std::fs::File>> {
    let file = std::fs::File::create(path).map_err(|err| SimulationError::io(path, err))?;
    Ok(BufWriter::new(file))
}

/// Writes all particles grouped by material, one zone per material.
pub fn write_snapshot_to(mut writer: impl Write, hydro: &Hydrodynamics) -> std::io::Result<()> {
    writeln!(writer, "title='particle position'")?;
    writeln!(writer, "variables=x, y, Ux, Uy, dUdt[0], dUdt[1], _dU[0], _dU[1], rho")?;

    let particles = hydro.particles();
    for (index, material) in hydro.materials().iter().enumerate() {
        let mut zone_written = false;
        for p in particles.iter().filter(|p| p.material() == index) {
            if !zone_written {
                writeln!(writer, "t='{}'", material.name)?;
                zone_written = true;
            }
            let (r, u, a, du) = (p.position(), p.velocity(), p.acceleration(), p.random_velocity());
            writeln!(
                writer,
                "{}  {}  {}  {}  {}  {}  {}  {}  {}",
                r.x,
                r.y,
                u.x,
                u.y,
                a.x,
                a.y,
                du.x,
                du.y,
                p.density()
            )?;
        }
    }
    writer.flush()
}

pub fn write_snapshot(directory: &Path, hydro: &Hydrodynamics, time: Real) -> Result<PathBuf> {
    let path = directory.join(snapshot_file_name(time));
    let writer = create(&path)?;
    write_snapshot_to(writer, hydro).map_err(|err| SimulationError::io(&path, err))?;
    Ok(path)
}

/// Regular sampling grid over the domain box with the initial particle spacing.
#[derive(Copy, Clone, Debug)]
pub struct StatesGrid {
    pub spacing: Real,
    pub num_points: [u32; 2],
}

impl StatesGrid {
    pub fn from_domain(domain: &DomainConfig) -> StatesGrid {
        StatesGrid {
            spacing: domain.particle_spacing(),
            num_points: [domain.cells[0] * domain.cell_ratio + 1, domain.cells[1] * domain.cell_ratio + 1],
        }
    }

    /// Grid points, x running fastest.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.num_points[1])
            .flat_map(move |j| (0..self.num_points[0]).map(move |i| Point::new(i as Real * self.spacing, j as Real * self.spacing)))
    }
}

/// Shepard-interpolated states on `grid`, one row per grid point in zone order.
/// Points without any particle in range are written as zeros. Returns the number of such points.
pub fn write_states_to<N, K>(mut writer: impl Write, hydro: &Hydrodynamics, neighbors: &N, kernel: &K, grid: &StatesGrid) -> std::io::Result<usize>
where
    N: NeighborProvider,
    K: Kernel,
{
    writeln!(writer, "title='mapped states'")?;
    writeln!(writer, "variables=x, y, p, rho, Ux, Uy, T")?;
    writeln!(writer, "zone t='field', i={}, j={}", grid.num_points[0], grid.num_points[1])?;

    let mut empty = 0;
    for point in grid.points() {
        let state = hydro.sample(neighbors, kernel, point).unwrap_or_else(|| {
            empty += 1;
            SampledState::zero()
        });
        writeln!(
            writer,
            "{}  {}  {}  {}  {}  {}  {}",
            point.x, point.y, state.pressure, state.density, state.velocity.x, state.velocity.y, state.temperature
        )?;
    }
    writer.flush()?;
    Ok(empty)
}

pub fn write_states<N, K>(directory: &Path, hydro: &Hydrodynamics, neighbors: &mut N, kernel: &K, grid: &StatesGrid, time: Real) -> Result<PathBuf>
where
    N: NeighborProvider,
    K: Kernel,
{
    let path = directory.join(states_file_name(time));
    neighbors.update(&hydro.particles().positions);
    let writer = create(&path)?;
    let empty = write_states_to(writer, hydro, &*neighbors, kernel, grid).map_err(|err| SimulationError::io(&path, err))?;
    if empty > 0 {
        log::warn!("{} sampling points without neighbors written as zeros in {}", empty, path.display());
    }
    Ok(path)
}

/// States averaged along x for every grid row: `y p rho Ux Uy T`.
/// Only points with particles in range are averaged, rows without any are written as zeros.
/// Returns the number of such rows.
pub fn write_averages_to<N, K>(mut writer: impl Write, hydro: &Hydrodynamics, neighbors: &N, kernel: &K, grid: &StatesGrid) -> std::io::Result<usize>
where
    N: NeighborProvider,
    K: Kernel,
{
    writeln!(writer, "title='averaged states'")?;
    writeln!(writer, "variables=y, p, rho, Ux, Uy, T")?;

    let mut empty_rows = 0;
    for row in 0..grid.num_points[1] {
        let y = row as Real * grid.spacing;
        let mut sum = SampledState::zero();
        let mut count = 0;
        for column in 0..grid.num_points[0] {
            if let Some(state) = hydro.sample(neighbors, kernel, Point::new(column as Real * grid.spacing, y)) {
                sum.pressure += state.pressure;
                sum.density += state.density;
                sum.velocity += state.velocity;
                sum.temperature += state.temperature;
                count += 1;
            }
        }

        let inv = if count > 0 { 1.0 / count as Real } else { 0.0 };
        if count == 0 {
            empty_rows += 1;
        }
        writeln!(
            writer,
            "{}  {}  {}  {}  {}  {}",
            y,
            sum.pressure * inv,
            sum.density * inv,
            sum.velocity.x * inv,
            sum.velocity.y * inv,
            sum.temperature * inv
        )?;
    }
    writer.flush()?;
    Ok(empty_rows)
}

pub fn write_averages<N, K>(directory: &Path, hydro: &Hydrodynamics, neighbors: &mut N, kernel: &K, grid: &StatesGrid, time: Real) -> Result<PathBuf>
where
    N: NeighborProvider,
    K: Kernel,
{
    let path = directory.join(averages_file_name(time));
    neighbors.update(&hydro.particles().positions);
    let writer = create(&path)?;
    let empty_rows = write_averages_to(writer, hydro, &*neighbors, kernel, grid).map_err(|err| SimulationError::io(&path, err))?;
    if empty_rows > 0 {
        log::warn!("{} grid rows without neighbors in {}", empty_rows, path.display());
    }
    Ok(path)
}
