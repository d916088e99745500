use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::scoring::{Employee, EmployeeId, RiskEngine};
use crate::workforce::{
    summarize_departments, workforce_router, DepartmentSummary, EmployeeFilter, EmployeePatch,
    EmployeeRepository, EmployeeSort, RepositoryError, RiskService,
};

fn skills(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Scores 71 (HIGH) with the basic algorithm.
pub(super) fn flight_risk_employee() -> Employee {
    let mut employee = Employee::new("EMP1001");
    employee.name = Some("Jordan Blake".to_string());
    employee.department = Some("Marketing".to_string());
    employee.role = Some("Data Analyst".to_string());
    employee.tenure_months = Some(4.0);
    employee.performance_rating = Some(1.5);
    employee.engagement_score = Some(30.0);
    employee.comp_ratio = Some(0.65);
    employee.critical_skills = skills(&["Machine Learning"]);
    employee
}

/// Scores 17 (LOW) with the basic algorithm.
pub(super) fn settled_employee() -> Employee {
    let mut employee = Employee::new("EMP1002");
    employee.name = Some("Priya Raman".to_string());
    employee.department = Some("Marketing".to_string());
    employee.role = Some("Brand Strategist".to_string());
    employee.tenure_months = Some(48.0);
    employee.performance_rating = Some(4.5);
    employee.engagement_score = Some(85.0);
    employee.comp_ratio = Some(1.15);
    employee
}

pub(super) fn finance_employee() -> Employee {
    let mut employee = Employee::new("EMP2001");
    employee.name = Some("Chen Wu".to_string());
    employee.department = Some("Finance".to_string());
    employee.role = Some("Accountant".to_string());
    employee
}

pub(super) fn build_service() -> (RiskService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = RiskService::new(repository.clone(), RiskEngine::default());
    (service, repository)
}

/// Service over a repository holding the two Marketing employees and one in Finance.
pub(super) fn seeded_service() -> (RiskService<MemoryRepository>, Arc<MemoryRepository>) {
    let (service, repository) = build_service();
    for employee in [flight_risk_employee(), settled_employee(), finance_employee()] {
        repository.insert(employee).expect("seed employee");
    }
    (service, repository)
}

pub(super) fn router_with_service(service: RiskService<MemoryRepository>) -> axum::Router {
    workforce_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<EmployeeId, Employee>>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: &str) -> Option<Employee> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&EmployeeId::from(id))
            .cloned()
    }
}

impl EmployeeRepository for MemoryRepository {
    fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_many(
        &self,
        filter: &EmployeeFilter,
        sort: EmployeeSort,
    ) -> Result<Vec<Employee>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut employees: Vec<Employee> = guard
            .values()
            .filter(|employee| filter.matches(employee))
            .cloned()
            .collect();
        sort.apply(&mut employees);
        Ok(employees)
    }

    fn insert(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let employee = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        patch.apply_validated(employee)?;
        Ok(employee.clone())
    }

    fn delete_one(&self, id: &EmployeeId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn count_documents(&self, filter: &EmployeeFilter) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().filter(|employee| filter.matches(employee)).count())
    }

    fn aggregate_by_department(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<Vec<DepartmentSummary>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(summarize_departments(
            guard.values().filter(|employee| filter.matches(employee)),
        ))
    }
}

/// Every write collides with an existing record.
pub(super) struct ConflictRepository;

impl EmployeeRepository for ConflictRepository {
    fn find_by_id(&self, _id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(None)
    }

    fn find_many(
        &self,
        _filter: &EmployeeFilter,
        _sort: EmployeeSort,
    ) -> Result<Vec<Employee>, RepositoryError> {
        Ok(Vec::new())
    }

    fn insert(&self, _employee: Employee) -> Result<Employee, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update_one(
        &self,
        _id: &EmployeeId,
        _patch: &EmployeePatch,
    ) -> Result<Employee, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn delete_one(&self, _id: &EmployeeId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn count_documents(&self, _filter: &EmployeeFilter) -> Result<usize, RepositoryError> {
        Ok(0)
    }

    fn aggregate_by_department(
        &self,
        _filter: &EmployeeFilter,
    ) -> Result<Vec<DepartmentSummary>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl EmployeeRepository for UnavailableRepository {
    fn find_by_id(&self, _id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_many(
        &self,
        _filter: &EmployeeFilter,
        _sort: EmployeeSort,
    ) -> Result<Vec<Employee>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _employee: Employee) -> Result<Employee, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_one(
        &self,
        _id: &EmployeeId,
        _patch: &EmployeePatch,
    ) -> Result<Employee, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_one(&self, _id: &EmployeeId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count_documents(&self, _filter: &EmployeeFilter) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn aggregate_by_department(
        &self,
        _filter: &EmployeeFilter,
    ) -> Result<Vec<DepartmentSummary>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
