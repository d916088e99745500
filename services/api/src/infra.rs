use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use talent_risk::config::ScoringSettings;
use talent_risk::error::AppError;
use talent_risk::scoring::{Employee, EmployeeId, RiskEngine};
use talent_risk::workforce::{
    summarize_departments, DepartmentSummary, EmployeeCsvImporter, EmployeeFilter, EmployeePatch,
    EmployeeRepository, EmployeeSort, RepositoryError,
};

/// Roster used by `demo` and to seed the development server.
pub(crate) const DEMO_ROSTER: &str = "\
employeeId,name,department,role,hireDate,tenureMonths,performanceRating,engagementScore,compRatio,criticalSkills,skillGaps
EMP1001,Jordan Blake,Marketing,Data Analyst,2025-02-03,4,1.5,30,0.65,Machine Learning,
EMP1002,Priya Raman,Marketing,Brand Strategist,2021-06-14,48,4.5,85,1.15,,
EMP1003,Marcus Lee,Engineering,Senior Software Engineer,2022-09-01,33,4.1,58,0.88,Kubernetes;Cloud Architecture;DevOps,
EMP1004,Sofia Alvarez,Engineering,Engineering Manager,2018-01-08,88,3.9,64,1.02,Cloud;Team Leadership,
EMP1005,Ethan Brooks,Sales,Account Executive,2023-11-20,19,4.6,72,0.95,Negotiation,CRM Automation
EMP1006,Hannah Kim,Sales,Sales Development Rep,2024-10-07,8,2.4,41,0.81,,Product Knowledge
EMP1007,Omar Haddad,Finance,Financial Analyst,2020-04-27,62,3.2,55,0.97,,
EMP1008,Grace Liu,Operations,Mainframe Administrator,2012-03-19,158,3.0,47,0.9,COBOL;Mainframe,Cloud
";

pub(crate) fn demo_roster() -> Result<Vec<Employee>, AppError> {
    Ok(EmployeeCsvImporter::from_reader(Cursor::new(DEMO_ROSTER))?)
}

pub(crate) fn build_engine(settings: &ScoringSettings) -> Result<RiskEngine, AppError> {
    let config = settings.load_scoring_config()?;
    Ok(RiskEngine::new(config)?)
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEmployeeRepository {
    records: Arc<Mutex<HashMap<EmployeeId, Employee>>>,
}

impl InMemoryEmployeeRepository {
    pub(crate) fn seeded(employees: Vec<Employee>) -> Result<Self, RepositoryError> {
        let repository = Self::default();
        for employee in employees {
            repository.insert(employee)?;
        }
        Ok(repository)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<EmployeeId, Employee>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("employee store poisoned".to_string()))
    }
}

impl EmployeeRepository for InMemoryEmployeeRepository {
    fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn find_many(
        &self,
        filter: &EmployeeFilter,
        sort: EmployeeSort,
    ) -> Result<Vec<Employee>, RepositoryError> {
        let mut employees: Vec<Employee> = self
            .lock()?
            .values()
            .filter(|employee| filter.matches(employee))
            .cloned()
            .collect();
        sort.apply(&mut employees);
        Ok(employees)
    }

    fn insert(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&employee.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(employee.id.clone(), employee.clone());
        Ok(employee)
    }

    fn update_one(
        &self,
        id: &EmployeeId,
        patch: &EmployeePatch,
    ) -> Result<Employee, RepositoryError> {
        let mut guard = self.lock()?;
        let employee = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        patch.apply_validated(employee)?;
        Ok(employee.clone())
    }

    fn delete_one(&self, id: &EmployeeId) -> Result<(), RepositoryError> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn count_documents(&self, filter: &EmployeeFilter) -> Result<usize, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|employee| filter.matches(employee))
            .count())
    }

    fn aggregate_by_department(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<Vec<DepartmentSummary>, RepositoryError> {
        let guard = self.lock()?;
        Ok(summarize_departments(
            guard.values().filter(|employee| filter.matches(employee)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_roster_imports_every_row() {
        let employees = demo_roster().expect("demo roster is valid");
        assert_eq!(employees.len(), 8);
        assert!(employees
            .iter()
            .any(|employee| employee.role.as_deref() == Some("Engineering Manager")));
    }

    #[test]
    fn seeded_repository_rejects_duplicates_and_patches_records() {
        let repository =
            InMemoryEmployeeRepository::seeded(demo_roster().expect("roster")).expect("seeded");
        let id = EmployeeId::from("EMP1006");

        assert!(matches!(
            repository.insert(Employee::new("EMP1006")),
            Err(RepositoryError::Conflict)
        ));

        let patch = EmployeePatch {
            engagement_score: Some(66.0),
            ..EmployeePatch::default()
        };
        let updated = repository.update_one(&id, &patch).expect("patched");
        assert_eq!(updated.engagement_score, Some(66.0));
        assert_eq!(updated.name.as_deref(), Some("Hannah Kim"));

        let sales = repository
            .count_documents(&EmployeeFilter::department("Sales"))
            .expect("count");
        assert_eq!(sales, 2);
    }

    #[test]
    fn invalid_patch_leaves_stored_record_untouched() {
        let repository =
            InMemoryEmployeeRepository::seeded(demo_roster().expect("roster")).expect("seeded");
        let id = EmployeeId::from("EMP1006");
        let before = repository.find_by_id(&id).expect("lookup");

        let patch = EmployeePatch {
            name: Some("Renamed".to_string()),
            performance_rating: Some(7.5),
            ..EmployeePatch::default()
        };
        assert!(matches!(
            repository.update_one(&id, &patch),
            Err(RepositoryError::Invalid(_))
        ));
        assert_eq!(repository.find_by_id(&id).expect("lookup"), before);
    }
}
