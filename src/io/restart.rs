use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SimulationError};
use crate::sph::{MaterialIndex, MaterialTable, ParticleKind, Particles};
use crate::units::*;

/// Persisted state of a real particle. Everything else is rebuilt when resuming.
#[derive(Clone, Debug, PartialEq)]
pub struct RestartParticle {
    pub material: MaterialIndex,
    pub position: Point,
    pub velocity: Vector,
    pub density: Real,
    pub pressure: Real,
    pub temperature: Real,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RestartData {
    pub time: Real,
    pub particles: Vec<RestartParticle>,
}

/// Line 1: time, line 2: number of real particles, then `name x y ux uy rho p T` per real particle.
pub fn write_restart_to(mut writer: impl Write, particles: &Particles, materials: &MaterialTable, time: Real) -> std::io::Result<()> {
    writeln!(writer, "{}", time)?;
    writeln!(writer, "{}", particles.num_real_particles())?;
    for p in particles.iter().filter(|p| p.kind() == ParticleKind::Real) {
        let (r, u) = (p.position(), p.velocity());
        writeln!(
            writer,
            "{}  {}  {}  {}  {}  {}  {}  {}",
            materials[p.material()].name,
            r.x,
            r.y,
            u.x,
            u.y,
            p.density(),
            p.pressure(),
            p.temperature()
        )?;
    }
    writer.flush()
}

pub fn write_restart(path: &Path, particles: &Particles, materials: &MaterialTable, time: Real) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|err| SimulationError::io(path, err))?;
    write_restart_to(BufWriter::new(file), particles, materials, time).map_err(|err| SimulationError::io(path, err))?;
    log::info!("wrote restart file {} at time {}", path.display(), time);
    Ok(())
}

fn restart_error(line: usize, message: impl Into<String>) -> SimulationError {
    SimulationError::Restart {
        line,
        message: message.into(),
    }
}

fn parse_number(token: Option<&str>, line: usize, what: &str) -> Result<Real> {
    let token = token.ok_or_else(|| restart_error(line, format!("missing {}", what)))?;
    token
        .parse::<Real>()
        .map_err(|_| restart_error(line, format!("cannot parse {} from '{}'", what, token)))
}

pub fn read_restart_from(reader: impl BufRead, materials: &MaterialTable) -> Result<RestartData> {
    // skip blank lines, keep 1-based line numbers for messages
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(k, line)| (k + 1, line))
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()));
    let mut next_line = |what: &str| -> Result<(usize, String)> {
        match lines.next() {
            Some((number, Ok(line))) => Ok((number, line)),
            Some((number, Err(err))) => Err(restart_error(number, err.to_string())),
            None => Err(restart_error(0, format!("unexpected end of file, expected {}", what))),
        }
    };

    let (number, line) = next_line("time")?;
    let time = parse_number(line.split_whitespace().next(), number, "time")?;

    let (number, line) = next_line("particle count")?;
    let count = line
        .trim()
        .parse::<usize>()
        .map_err(|_| restart_error(number, format!("cannot parse particle count from '{}'", line.trim())))?;

    let mut particles = Vec::with_capacity(count);
    for _ in 0..count {
        let (number, line) = next_line("particle")?;
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or_else(|| restart_error(number, "missing material name"))?;
        let material = materials.find(name).ok_or_else(|| SimulationError::UnknownMaterial(name.to_string()))?;
        let mut value = |what| parse_number(tokens.next(), number, what);
        let position = Point::new(value("x")?, value("y")?);
        let velocity = Vector::new(value("ux")?, value("uy")?);
        let density = value("density")?;
        let pressure = value("pressure")?;
        let temperature = value("temperature")?;
        if !(density > 0.0 && density.is_finite()) {
            return Err(restart_error(number, format!("density must be positive, got {}", density)));
        }
        if !(temperature >= 0.0 && temperature.is_finite()) {
            return Err(restart_error(number, format!("temperature must not be negative, got {}", temperature)));
        }
        let finite = [position.x, position.y, velocity.x, velocity.y, pressure].iter().all(|v| v.is_finite());
        if !finite {
            return Err(restart_error(number, "non-finite position, velocity or pressure"));
        }
        particles.push(RestartParticle {
            material,
            position,
            velocity,
            density,
            pressure,
            temperature,
        });
    }

    if let Some((number, _)) = lines.next() {
        return Err(restart_error(number, format!("more particles than the announced {}", count)));
    }
    Ok(RestartData { time, particles })
}

pub fn read_restart(path: &Path, materials: &MaterialTable) -> Result<RestartData> {
    let file = std::fs::File::open(path).map_err(|err| SimulationError::io(path, err))?;
    let data = read_restart_from(BufReader::new(file), materials)?;
    log::info!("read {} particles at time {} from {}", data.particles.len(), data.time, path.display());
    Ok(data)
}
