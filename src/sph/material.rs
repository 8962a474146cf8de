use crate::units::*;

pub type MaterialIndex = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Solid,
    Liquid,
    Gas,
}

/// Thermodynamic and transport constants of a single material.
///
/// Pressure follows an artificial compressibility closure p = b0 (ρ/ρ0)^γ.
/// b0 is refined once for the whole system via [`Material::refine_reference_pressure`].
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub material_type: MaterialType,

    pub heat_capacity: Real,   // cv
    pub shear_viscosity: Real, // η, eta
    pub bulk_viscosity: Real,  // ζ, zeta
    pub heat_conduction: Real, // κ, kappa
    pub gamma: Real,           // γ, exponent of the equation of state
    pub b0: Real,              // reference pressure
    pub rho0: Real,            // reference density ρ0
    pub a0: Real,              // 1/a0 is the permitted density fluctuation
}

impl Material {
    /// Kinematic viscosity ν = max(η, ζ) / ρ0
    pub fn kinematic_viscosity(&self) -> Real {
        self.shear_viscosity.max(self.bulk_viscosity) / self.rho0
    }

    #[inline]
    pub fn pressure(&self, density: Real) -> Real {
        self.b0 * (density / self.rho0).powf(self.gamma)
    }

    #[inline]
    pub fn density(&self, pressure: Real) -> Real {
        self.rho0 * (pressure / self.b0).powf(1.0 / self.gamma)
    }

    #[inline]
    pub fn sound_speed(&self, pressure: Real, density: Real) -> Real {
        (self.gamma * pressure / density).sqrt()
    }

    #[inline]
    pub fn internal_energy(&self, temperature: Real) -> Real {
        self.heat_capacity * temperature
    }

    /// Ties the artificial compressibility to the dominant time scale of the system.
    /// `sound`: largest characteristic speed² scale across all materials.
    pub fn refine_reference_pressure(&mut self, sound: Real) {
        self.b0 = self.a0 * sound / self.gamma;
    }

    pub fn log_properties(&self) {
        log::info!("Material: {} ({:?})", self.name, self.material_type);
        log::info!("  heat capacity {} J/kg/K", self.heat_capacity);
        log::info!("  viscosity {} / {} Pa.s (shear / bulk)", self.shear_viscosity, self.bulk_viscosity);
        log::info!("  heat conduction coefficient {} J/s/m^2/T", self.heat_conduction);
        log::info!("  heat ratio {}", self.gamma);
        log::info!("  reference pressure b0 {} Pa", self.b0);
        log::info!("  reference density {} kg/m^3", self.rho0);
        log::info!("  permitted compressibility {} percent", 100.0 / self.a0);
    }
}

/// All materials of a run. Indices into it are stable for the run's duration.
#[derive(Clone, Debug, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    pub fn new(materials: Vec<Material>) -> MaterialTable {
        MaterialTable { materials }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Material> {
        self.materials.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Material> {
        self.materials.iter_mut()
    }

    pub fn find(&self, name: &str) -> Option<MaterialIndex> {
        self.materials.iter().position(|m| m.name == name)
    }

    pub fn max_kinematic_viscosity(&self) -> Real {
        self.materials.iter().map(Material::kinematic_viscosity).fold(0.0, Real::max)
    }
}

impl std::ops::Index<MaterialIndex> for MaterialTable {
    type Output = Material;

    #[inline]
    fn index(&self, index: MaterialIndex) -> &Material {
        &self.materials[index]
    }
}

#[cfg(test)]
pub(crate) fn test_material(name: &str) -> Material {
    Material {
        name: name.to_string(),
        material_type: MaterialType::Liquid,
        heat_capacity: 1.0,
        shear_viscosity: 0.1,
        bulk_viscosity: 0.05,
        heat_conduction: 0.0,
        gamma: 7.0,
        b0: 2.0,
        rho0: 1.0,
        a0: 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::*;

    #[test]
    fn pressure_at_reference_density() {
        let material = test_material("water");
        assert_eq!(material.pressure(material.rho0), material.b0);
    }

    #[test]
    fn pressure_monotonic_in_density() {
        let material = test_material("water");
        let mut previous = material.pressure(0.01);
        for step in 2..300 {
            let density = 0.01 * step as Real;
            let pressure = material.pressure(density);
            assert_gt!(pressure, previous);
            previous = pressure;
        }
    }

    #[test]
    fn density_pressure_roundtrip() {
        let material = test_material("water");
        for &density in &[0.5, 0.97, 1.0, 1.03, 2.5] {
            let roundtrip = material.density(material.pressure(density));
            assert_lt!((roundtrip - density).abs(), 1.0e-12 * density);
        }
    }

    #[test]
    fn sound_speed() {
        let material = test_material("water");
        let c = material.sound_speed(material.b0, material.rho0);
        assert_lt!((c * c - material.gamma * material.b0 / material.rho0).abs(), 1.0e-12);
    }

    #[test]
    fn internal_energy_is_linear_in_temperature() {
        let mut material = test_material("water");
        material.heat_capacity = 4.0;
        assert_eq!(material.internal_energy(0.5), 2.0);
    }

    #[test]
    fn refined_reference_pressure() {
        let mut material = test_material("water");
        material.refine_reference_pressure(0.5);
        assert_eq!(material.b0, 100.0 * 0.5 / 7.0);
    }

    #[test]
    fn max_kinematic_viscosity() {
        let mut oil = test_material("oil");
        oil.shear_viscosity = 0.4;
        oil.rho0 = 2.0;
        let table = MaterialTable::new(vec![test_material("water"), oil]);
        assert_eq!(table.max_kinematic_viscosity(), 0.2);
        assert_eq!(table.find("oil"), Some(1));
        assert_eq!(table.find("air"), None);
    }
}
