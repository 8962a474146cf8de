//! Run configuration, read from a TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SimulationError};
use crate::sph::{Gravity, HydrodynamicsSettings, Material, MaterialTable, MaterialType, PairCoefficient, PairCoefficients};
use crate::units::*;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub domain: DomainConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    pub timing: TimingConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub initial: InitialConfig,
    pub materials: Vec<MaterialConfig>,
    #[serde(default)]
    pub interactions: Vec<InteractionConfig>,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    pub cells: [u32; 2],
    pub cell_size: Real,
    /// cell size / initial particle spacing
    pub cell_ratio: u32,
    pub smoothing_length: Real,
}

impl DomainConfig {
    pub fn box_size(&self) -> Vector {
        Vector::new(self.cells[0] as Real, self.cells[1] as Real) * self.cell_size
    }

    /// Initial particle spacing δ.
    pub fn particle_spacing(&self) -> Real {
        self.cell_size / self.cell_ratio as Real
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GravityProfile {
    #[default]
    Uniform,
    Kolmogorov,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhysicsConfig {
    #[serde(default)]
    pub gravity: [Real; 2],
    #[serde(default)]
    pub gravity_profile: GravityProfile,
    #[serde(default)]
    pub boltzmann_constant: Real,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(default)]
    pub start_time: Real,
    pub end_time: Real,
    pub output_interval: Real,
    pub max_timestep: Option<Real>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityMethod {
    #[default]
    Summation,
    Continuity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelChoice {
    #[default]
    Quintic,
    Cubic,
    Wendland,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    #[serde(default)]
    pub density: DensityMethod,
    #[serde(default)]
    pub kernel: KernelChoice,
    #[serde(default = "default_true")]
    pub multiphase: bool,
    /// Number of private accumulators for pair summations. Defaults to the number of threads.
    pub workers: Option<usize>,
    #[serde(default)]
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            density: Default::default(),
            kernel: Default::default(),
            multiphase: true,
            workers: None,
            seed: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialSource {
    #[default]
    Config,
    Restart,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialConfig {
    #[serde(default)]
    pub source: InitialSource,
    pub restart_file: Option<PathBuf>,
    #[serde(default)]
    pub velocity: [Real; 2],
    #[serde(default = "default_temperature")]
    pub temperature: Real,
}

impl Default for InitialConfig {
    fn default() -> Self {
        InitialConfig {
            source: Default::default(),
            restart_file: None,
            velocity: [0.0, 0.0],
            temperature: default_temperature(),
        }
    }
}

fn default_temperature() -> Real {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub heat_capacity: Real,
    pub shear_viscosity: Real,
    pub bulk_viscosity: Real,
    pub heat_conduction: Real,
    pub gamma: Real,
    pub b0: Real,
    pub rho0: Real,
    pub a0: Real,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InteractionConfig {
    pub materials: [String; 2],
    #[serde(default)]
    pub epsilon: Real,
    #[serde(default)]
    pub sigma: Real,
    #[serde(default)]
    pub shear_slip: Real,
    #[serde(default)]
    pub bulk_slip: Real,
    #[serde(default)]
    pub heat_slip: Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Fluid,
    Wall,
}

/// Rectangle filled with particles on the initial lattice.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub material: String,
    pub kind: RegionKind,
    pub min: [Real; 2],
    pub max: [Real; 2],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub states_grid: bool,
    /// Also write row-averaged states, e.g. for channel or Kolmogorov flow profiles.
    #[serde(default)]
    pub averages: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_output_directory(),
            states_grid: false,
            averages: false,
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("outdata")
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<SimulationConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| SimulationError::io(path, err))?;
        let config = Self::parse(&text)?;
        log::info!("read configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<SimulationConfig> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn check(condition: bool, message: &str) -> Result<()> {
            if condition {
                Ok(())
            } else {
                Err(SimulationError::InvalidConfig(message.to_string()))
            }
        }

        let domain = &self.domain;
        check(domain.cells[0] > 0 && domain.cells[1] > 0, "domain.cells must be positive")?;
        check(domain.cell_size > 0.0, "domain.cell_size must be positive")?;
        check(domain.cell_ratio > 0, "domain.cell_ratio must be positive")?;
        check(domain.smoothing_length > 0.0, "domain.smoothing_length must be positive")?;

        let timing = &self.timing;
        check(timing.end_time >= timing.start_time, "timing.end_time must not be before timing.start_time")?;
        check(timing.output_interval > 0.0, "timing.output_interval must be positive")?;
        check(timing.max_timestep.map_or(true, |dt| dt > 0.0), "timing.max_timestep must be positive")?;
        check(self.solver.workers != Some(0), "solver.workers must be positive")?;
        check(self.physics.boltzmann_constant >= 0.0, "physics.boltzmann_constant must not be negative")?;

        check(!self.materials.is_empty(), "at least one material is required")?;
        for material in &self.materials {
            if material.gamma <= 0.0 || material.rho0 <= 0.0 || material.a0 <= 0.0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "material '{}': gamma, rho0 and a0 must be positive",
                    material.name
                )));
            }
        }
        for (k, material) in self.materials.iter().enumerate() {
            if self.materials[..k].iter().any(|other| other.name == material.name) {
                return Err(SimulationError::InvalidConfig(format!("material '{}' is defined twice", material.name)));
            }
        }

        if self.initial.source == InitialSource::Restart {
            check(self.initial.restart_file.is_some(), "initial.restart_file is required for restart runs")?;
        }
        for region in &self.regions {
            if region.max[0] < region.min[0] || region.max[1] < region.min[1] {
                return Err(SimulationError::InvalidConfig(format!("region of '{}' has max below min", region.material)));
            }
        }
        Ok(())
    }

    pub fn material_table(&self) -> MaterialTable {
        MaterialTable::new(
            self.materials
                .iter()
                .map(|m| Material {
                    name: m.name.clone(),
                    material_type: m.material_type,
                    heat_capacity: m.heat_capacity,
                    shear_viscosity: m.shear_viscosity,
                    bulk_viscosity: m.bulk_viscosity,
                    heat_conduction: m.heat_conduction,
                    gamma: m.gamma,
                    b0: m.b0,
                    rho0: m.rho0,
                    a0: m.a0,
                })
                .collect(),
        )
    }

    /// Every ordered material pair needs exactly one entry.
    pub fn pair_coefficients(&self, materials: &MaterialTable) -> Result<PairCoefficients> {
        let num_materials = materials.len();
        let mut coefficients = PairCoefficients::zeros(num_materials);
        let mut seen = vec![false; num_materials * num_materials];

        for interaction in &self.interactions {
            let [first, second] = &interaction.materials;
            let a = materials.find(first).ok_or_else(|| SimulationError::UnknownMaterial(first.clone()))?;
            let b = materials.find(second).ok_or_else(|| SimulationError::UnknownMaterial(second.clone()))?;
            if std::mem::replace(&mut seen[a * num_materials + b], true) {
                return Err(SimulationError::PairCoefficients {
                    first: first.clone(),
                    second: second.clone(),
                    problem: "are given more than once",
                });
            }
            coefficients.set(
                a,
                b,
                PairCoefficient {
                    epsilon: interaction.epsilon,
                    sigma: interaction.sigma,
                    shear_slip: interaction.shear_slip,
                    bulk_slip: interaction.bulk_slip,
                    heat_slip: interaction.heat_slip,
                },
            );
        }

        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(SimulationError::PairCoefficients {
                first: materials[missing / num_materials].name.clone(),
                second: materials[missing % num_materials].name.clone(),
                problem: "are missing",
            });
        }
        Ok(coefficients)
    }

    pub fn gravity(&self) -> Gravity {
        let [gx, gy] = self.physics.gravity;
        match self.physics.gravity_profile {
            GravityProfile::Uniform => Gravity::Uniform(Vector::new(gx, gy)),
            GravityProfile::Kolmogorov => Gravity::Kolmogorov {
                amplitude: gx,
                period: self.domain.box_size().y,
            },
        }
    }

    pub fn num_workers(&self) -> usize {
        self.solver.workers.unwrap_or_else(rayon::current_num_threads)
    }

    pub fn hydrodynamics_settings(&self) -> HydrodynamicsSettings {
        HydrodynamicsSettings {
            gravity: self.gravity(),
            boltzmann_constant: self.physics.boltzmann_constant,
            num_workers: self.num_workers(),
        }
    }

    /// Upper bound for a single step, used when no physical bound applies.
    pub fn max_timestep(&self) -> Real {
        self.timing.max_timestep.unwrap_or(self.timing.output_interval)
    }
}

#[cfg(test)]
pub(crate) const TWO_PHASE_CONFIG: &str = r#"
[domain]
cells = [4, 4]
cell_size = 0.25
cell_ratio = 4
smoothing_length = 0.15

[physics]
gravity = [0.0, -1.0]

[timing]
end_time = 0.01
output_interval = 0.005

[solver]
density = "summation"
workers = 2
seed = 11

[[materials]]
name = "water"
type = "liquid"
heat_capacity = 1.0
shear_viscosity = 0.1
bulk_viscosity = 0.1
heat_conduction = 0.0
gamma = 7.0
b0 = 1.0
rho0 = 1.0
a0 = 100.0

[[materials]]
name = "wall"
type = "solid"
heat_capacity = 1.0
shear_viscosity = 0.1
bulk_viscosity = 0.1
heat_conduction = 0.0
gamma = 7.0
b0 = 1.0
rho0 = 1.0
a0 = 100.0

[[interactions]]
materials = ["water", "water"]

[[interactions]]
materials = ["water", "wall"]
sigma = 0.5

[[interactions]]
materials = ["wall", "water"]
sigma = 0.5

[[interactions]]
materials = ["wall", "wall"]

[[regions]]
material = "water"
kind = "fluid"
min = [0.0, 0.0]
max = [1.0, 0.5]

[[regions]]
material = "wall"
kind = "wall"
min = [0.0, -0.125]
max = [1.0, 0.0]
"#;
