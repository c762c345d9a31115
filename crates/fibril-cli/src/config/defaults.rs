use fibrilkit::core::models::morphology::Handedness;

pub struct DefaultsConfig {
    pub num_half: usize,
    pub handedness: Handedness,
    pub anchor_atom: &'static str,
    /// Name of the scene object the template structure is loaded into.
    pub template_object: &'static str,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            num_half: 10,
            handedness: Handedness::Left,
            anchor_atom: "CA",
            template_object: "template",
        }
    }
}
