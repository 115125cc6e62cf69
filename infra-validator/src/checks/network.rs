//! Network: tagged VPC, attached internet gateway, public subnets, default route.

use anyhow::Result;
use serde_json::{Map, Value};

use super::{CheckEnv, ParseErrors};
use crate::core::shapes::{InternetGatewayList, RouteTableList, SubnetList, VpcList};
use crate::core::types::{CheckStatus, CheckVerdict};

pub const NAME: &str = "Network(VPC/IGW/Subnets/Route)";

const MIN_PUBLIC_SUBNETS: usize = 2;

pub fn run(env: &CheckEnv<'_>) -> Result<CheckVerdict> {
    let tag = &env.config().project_tag;
    let mut errors = ParseErrors::default();

    let vpcs = env.run_recorded(
        &env.aws_regional([
            "ec2".to_string(),
            "describe-vpcs".to_string(),
            "--filters".to_string(),
            format!("Name=tag:Name,Values={tag}-vpc"),
        ]),
        "ec2_describe_vpcs.json",
    )?;
    let vpc_ok = errors
        .decode::<VpcList>("vpc", &vpcs)
        .is_some_and(|list| !list.vpcs.is_empty());

    let gateways = env.run_recorded(
        &env.aws_regional([
            "ec2",
            "describe-internet-gateways",
            "--filters",
            "Name=attachment.state,Values=available",
        ]),
        "ec2_describe_internet_gateways.json",
    )?;
    let igw_ok = errors
        .decode::<InternetGatewayList>("igw", &gateways)
        .is_some_and(|list| !list.internet_gateways.is_empty());

    let subnets = env.run_recorded(
        &env.aws_regional([
            "ec2".to_string(),
            "describe-subnets".to_string(),
            "--filters".to_string(),
            format!("Name=tag:Name,Values={tag}-public-*"),
        ]),
        "ec2_describe_subnets_public.json",
    )?;
    let subnets_ok = errors
        .decode::<SubnetList>("subnets>=2", &subnets)
        .is_some_and(|list| list.subnets.len() >= MIN_PUBLIC_SUBNETS);

    let routes = env.run_recorded(
        &env.aws_regional(["ec2", "describe-route-tables"]),
        "ec2_describe_route_tables.json",
    )?;
    let route_ok = errors
        .decode::<RouteTableList>("route_to_igw", &routes)
        .is_some_and(|tables| tables.has_default_route_to_internet_gateway());

    let mut detail = Map::new();
    detail.insert("vpc".to_string(), Value::Bool(vpc_ok));
    detail.insert("igw".to_string(), Value::Bool(igw_ok));
    detail.insert("subnets>=2".to_string(), Value::Bool(subnets_ok));
    detail.insert("route_to_igw".to_string(), Value::Bool(route_ok));
    errors.attach(&mut detail);

    let ok = vpc_ok && igw_ok && subnets_ok && route_ok;
    Ok(CheckVerdict::new(
        NAME,
        CheckStatus::from_bool(ok),
        Value::Object(detail),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedRunner, TestRun, healthy_runner};

    const VPCS: &str = "aws ec2 describe-vpcs --filters Name=tag:Name,Values=demo-vpc --region us-east-1";
    const SUBNETS: &str =
        "aws ec2 describe-subnets --filters Name=tag:Name,Values=demo-public-* --region us-east-1";
    const ROUTES: &str = "aws ec2 describe-route-tables --region us-east-1";

    #[test]
    fn passes_with_complete_network() {
        let harness = TestRun::new();
        let runner = healthy_runner(harness.config());

        let verdict = harness.check(&runner, run).expect("check");
        assert_eq!(verdict.status, CheckStatus::Pass);
        assert_eq!(
            verdict.detail,
            serde_json::json!({"vpc": true, "igw": true, "subnets>=2": true, "route_to_igw": true})
        );
        for name in [
            "ec2_describe_vpcs.json",
            "ec2_describe_internet_gateways.json",
            "ec2_describe_subnets_public.json",
            "ec2_describe_route_tables.json",
        ] {
            assert!(harness.has_evidence(name), "{name}");
        }
    }

    #[test]
    fn single_subnet_fails_only_that_condition() {
        let harness = TestRun::new();
        let runner = healthy_runner(harness.config()).respond(
            SUBNETS,
            0,
            r#"{"Subnets": [{"SubnetId": "subnet-1"}]}"#,
        );

        let verdict = harness.check(&runner, run).expect("check");
        assert_eq!(verdict.status, CheckStatus::Fail);
        assert_eq!(verdict.detail["subnets>=2"], false);
        assert_eq!(verdict.detail["vpc"], true);
        assert_eq!(verdict.detail["route_to_igw"], true);
    }

    #[test]
    fn nat_default_route_does_not_count() {
        let harness = TestRun::new();
        let runner = healthy_runner(harness.config()).respond(
            ROUTES,
            0,
            r#"{"RouteTables": [{"Routes": [{"DestinationCidrBlock": "0.0.0.0/0", "NatGatewayId": "nat-1"}]}]}"#,
        );

        let verdict = harness.check(&runner, run).expect("check");
        assert_eq!(verdict.status, CheckStatus::Fail);
        assert_eq!(verdict.detail["route_to_igw"], false);
    }

    #[test]
    fn failed_lookup_continues_with_remaining_calls() {
        let harness = TestRun::new();
        let runner = healthy_runner(harness.config()).respond_full(VPCS, 255, "", "AccessDenied");

        let verdict = harness.check(&runner, run).expect("check");
        assert_eq!(verdict.status, CheckStatus::Fail);
        assert_eq!(verdict.detail["vpc"], false);
        assert_eq!(verdict.detail["igw"], true);
        assert!(verdict.detail.get("parse_error").is_none());
        assert!(runner.calls().iter().any(|call| call == ROUTES));
    }

    #[test]
    fn shape_drift_is_reported_as_parse_error() {
        let harness = TestRun::new();
        let runner = ScriptedRunner::new().respond(VPCS, 0, r#"{"Vpcs": "vpc-1"}"#);

        let verdict = harness.check(&runner, run).expect("check");
        assert_eq!(verdict.status, CheckStatus::Fail);
        let message = verdict.detail["parse_error"]["vpc"]
            .as_str()
            .expect("parse error message");
        assert!(message.starts_with("VpcList: "));
    }
}
