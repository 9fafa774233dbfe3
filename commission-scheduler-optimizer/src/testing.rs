use commission_scheduler_model::{
    Availability, Candidate, CandidateId, Commission, CommissionId, Configuration,
    ConfigurationId, DegreeLevel, Professor, ProfessorId, Role,
};

pub fn professor(id: i32, role: Role, availability: Availability) -> Professor {
    Professor {
        id: ProfessorId(id),
        name: format!("Name{id}"),
        surname: format!("Surname{id}"),
        role,
        availability,
    }
}

pub fn candidate(
    id: i32,
    degree_level: DegreeLevel,
    supervisor: i32,
    counter_supervisor: Option<i32>,
) -> Candidate {
    Candidate {
        id: CandidateId(id),
        name: format!("Student{id}"),
        surname: format!("Surname{id}"),
        degree_level,
        supervisor: Some(ProfessorId(supervisor)),
        counter_supervisor: counter_supervisor.map(ProfessorId),
        assistant_supervisor: None,
    }
}

pub fn commission(candidates: Vec<Candidate>, professors: Vec<Professor>) -> Commission {
    Commission {
        id: CommissionId(1),
        title: "Graduation session".to_owned(),
        candidates,
        professors,
    }
}

pub fn configuration(morning: u32, afternoon: u32) -> Configuration {
    let mut configuration = Configuration::new(ConfigurationId(1), CommissionId(1));
    configuration.max_morning_slots = morning;
    configuration.max_afternoon_slots = afternoon;
    configuration
}
