//! Duration arithmetic on dateTime and date values.

use xacml_core::{
    AttributeValue, Datatype, DayTimeDuration, EvalResult, IndeterminateError, Value,
    YearMonthDuration,
};

use super::{as_prim, eager, urn};
use crate::function::FunctionRegistry;

pub(super) fn register(registry: &mut FunctionRegistry) {
    register_datetime_day_time(registry, "dateTime-add-dayTimeDuration", false);
    register_datetime_day_time(registry, "dateTime-subtract-dayTimeDuration", true);
    register_datetime_year_month(registry, "dateTime-add-yearMonthDuration", false);
    register_datetime_year_month(registry, "dateTime-subtract-yearMonthDuration", true);
    register_date_year_month(registry, "date-add-yearMonthDuration", false);
    register_date_year_month(registry, "date-subtract-yearMonthDuration", true);
}

fn processing(e: String) -> IndeterminateError {
    IndeterminateError::processing_error(e)
}

fn day_time_arg(v: &AttributeValue, negate: bool) -> EvalResult<DayTimeDuration> {
    match v {
        AttributeValue::DayTimeDuration(d) => Ok(if negate {
            DayTimeDuration::from_millis(-d.total_millis())
        } else {
            d.clone()
        }),
        _ => Err(processing("internal: argument is not a dayTimeDuration".into())),
    }
}

fn year_month_arg(v: &AttributeValue, negate: bool) -> EvalResult<YearMonthDuration> {
    match v {
        AttributeValue::YearMonthDuration(d) => Ok(if negate {
            YearMonthDuration::from_months(-d.total_months())
        } else {
            d.clone()
        }),
        _ => Err(processing("internal: argument is not a yearMonthDuration".into())),
    }
}

fn register_datetime_day_time(registry: &mut FunctionRegistry, name: &str, negate: bool) {
    registry.register(eager(
        urn("3.0", name),
        vec![Datatype::DateTime.into(), Datatype::DayTimeDuration.into()],
        Datatype::DateTime.into(),
        move |args| {
            let AttributeValue::DateTime(dt) = as_prim(&args[0])? else {
                return Err(processing("internal: argument is not a dateTime".into()));
            };
            let d = day_time_arg(as_prim(&args[1])?, negate)?;
            dt.add_day_time_duration(&d)
                .map(|v| AttributeValue::DateTime(Box::new(v)).into())
                .map_err(processing)
        },
    ));
}

fn register_datetime_year_month(registry: &mut FunctionRegistry, name: &str, negate: bool) {
    registry.register(eager(
        urn("3.0", name),
        vec![Datatype::DateTime.into(), Datatype::YearMonthDuration.into()],
        Datatype::DateTime.into(),
        move |args| {
            let AttributeValue::DateTime(dt) = as_prim(&args[0])? else {
                return Err(processing("internal: argument is not a dateTime".into()));
            };
            let d = year_month_arg(as_prim(&args[1])?, negate)?;
            dt.add_year_month_duration(&d)
                .map(|v| AttributeValue::DateTime(Box::new(v)).into())
                .map_err(processing)
        },
    ));
}

fn register_date_year_month(registry: &mut FunctionRegistry, name: &str, negate: bool) {
    registry.register(eager(
        urn("3.0", name),
        vec![Datatype::Date.into(), Datatype::YearMonthDuration.into()],
        Datatype::Date.into(),
        move |args| {
            let AttributeValue::Date(date) = as_prim(&args[0])? else {
                return Err(processing("internal: argument is not a date".into()));
            };
            let d = year_month_arg(as_prim(&args[1])?, negate)?;
            date.add_year_month_duration(&d)
                .map(|v| AttributeValue::Date(v).into())
                .map_err(processing)
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    fn eval(name: &str, args: Vec<AttributeValue>) -> Value {
        let registry = FunctionRegistry::standard();
        let f = registry.first_order(&urn("3.0", name)).unwrap();
        let exprs = args
            .into_iter()
            .map(|v| Expression::Constant(Value::Primitive(v)))
            .collect();
        f.new_call(exprs, &[]).unwrap().evaluate(None).unwrap()
    }

    #[test]
    fn datetime_plus_day_time() {
        let dt = AttributeValue::parse(Datatype::DateTime, "2024-03-01T10:00:00Z").unwrap();
        let d = AttributeValue::parse(Datatype::DayTimeDuration, "PT14H").unwrap();
        let expected = AttributeValue::parse(Datatype::DateTime, "2024-03-02T00:00:00Z").unwrap();
        assert_eq!(eval("dateTime-add-dayTimeDuration", vec![dt, d]), expected.into());
    }

    #[test]
    fn datetime_minus_year_month() {
        let dt = AttributeValue::parse(Datatype::DateTime, "2024-03-31T00:00:00Z").unwrap();
        let d = AttributeValue::parse(Datatype::YearMonthDuration, "P1M").unwrap();
        // Feb 2024 has 29 days; the day clamps
        let expected = AttributeValue::parse(Datatype::DateTime, "2024-02-29T00:00:00Z").unwrap();
        assert_eq!(
            eval("dateTime-subtract-yearMonthDuration", vec![dt, d]),
            expected.into()
        );
    }

    #[test]
    fn date_plus_year_month() {
        let date = AttributeValue::parse(Datatype::Date, "2020-06-15").unwrap();
        let d = AttributeValue::parse(Datatype::YearMonthDuration, "P2Y1M").unwrap();
        let expected = AttributeValue::parse(Datatype::Date, "2022-07-15").unwrap();
        assert_eq!(eval("date-add-yearMonthDuration", vec![date, d]), expected.into());
    }
}
