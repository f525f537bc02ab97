use powerlens_core::SolutionType;

pub const SYSTEM_INSTRUCTION: &str = "\
You are an elite Power Platform Architect and Lead Developer. \
Your expertise spans Power Apps (Power Fx), Power Automate (Logic Apps/JSON) and Power BI (DAX/M).\n\
Your task is to analyze code provided by the user.\n\
- Identify logic errors, performance bottlenecks, security vulnerabilities and accessibility issues.\n\
- Provide a short summary of the analysis.\n\
- Assign an overall health score from 0 to 100.\n\
- List specific issues, each with an id, category, severity, title, description and a clear \
recommendation. Quote the affected code in \"snippet\" when it helps.\n\
- Category must be one of: Logic, Performance, Best Practice, Security, Accessibility.\n\
- Severity must be one of: Critical, Warning, Info.\n\
- Provide an optimized version of the code in \"optimizedCode\", in the same language as the input.\n\
Return exactly the JSON structure requested and nothing else.";

pub fn user_message(solution_type: SolutionType, code: &str) -> String {
    format!("Analyze this {} code: \n\n{}", solution_type.label(), code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_names_the_dialect_and_keeps_code_verbatim() {
        let code = "Total Sales = SUM(Sales[Amount])\n  -- trailing";
        let msg = user_message(SolutionType::PowerBi, code);
        assert_eq!(
            msg,
            "Analyze this Power BI (DAX/M Query) code: \n\nTotal Sales = SUM(Sales[Amount])\n  -- trailing"
        );
    }

    #[test]
    fn system_instruction_lists_allowed_labels() {
        for label in ["Logic", "Performance", "Best Practice", "Security", "Accessibility"] {
            assert!(SYSTEM_INSTRUCTION.contains(label), "missing category {label}");
        }
        for label in ["Critical", "Warning", "Info"] {
            assert!(SYSTEM_INSTRUCTION.contains(label), "missing severity {label}");
        }
    }
}
