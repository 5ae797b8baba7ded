// src/fetch/forms.rs

use crate::config::FetchConfig;
use crate::process::html_table::TableContract;

/// A TabNet tabulation scraped once per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measure {
    Births,
    Spending,
    Population,
}

const SINASC_FORM: &str = "Linha=Munic%EDpio&Coluna=--N%E3o-Ativa--&Incremento=Nascim_p%2Fresid.m%E3e&Arquivos=nvbr{yy}.dbf&pesqmes1=Digite+o+texto+e+ache+f%E1cil&SMunic%EDpio=TODAS_AS_CATEGORIAS__&pesqmes2=Digite+o+texto+e+ache+f%E1cil&SCapital=TODAS_AS_CATEGORIAS__&pesqmes3=Digite+o+texto+e+ache+f%E1cil&SRegi%E3o_de_Sa%FAde_%28CIR%29=TODAS_AS_CATEGORIAS__&pesqmes4=Digite+o+texto+e+ache+f%E1cil&SMacrorregi%E3o_de_Sa%FAde=TODAS_AS_CATEGORIAS__&pesqmes5=Digite+o+texto+e+ache+f%E1cil&SMicrorregi%E3o_IBGE=TODAS_AS_CATEGORIAS__&pesqmes6=Digite+o+texto+e+ache+f%E1cil&SRegi%E3o_Metropolitana_-_RIDE=TODAS_AS_CATEGORIAS__&pesqmes7=Digite+o+texto+e+ache+f%E1cil&STerrit%F3rio_da_Cidadania=TODAS_AS_CATEGORIAS__&pesqmes8=Digite+o+texto+e+ache+f%E1cil&SMesorregi%E3o_PNDR=TODAS_AS_CATEGORIAS__&SAmaz%F4nia_Legal=TODAS_AS_CATEGORIAS__&SSemi%E1rido=TODAS_AS_CATEGORIAS__&SFaixa_de_Fronteira=TODAS_AS_CATEGORIAS__&SZona_de_Fronteira=TODAS_AS_CATEGORIAS__&SMunic%EDpio_de_extrema_pobreza=TODAS_AS_CATEGORIAS__&SLocal_ocorr%EAncia=TODAS_AS_CATEGORIAS__&pesqmes15=Digite+o+texto+e+ache+f%E1cil&SIdade_da_m%E3e=TODAS_AS_CATEGORIAS__&pesqmes16=Digite+o+texto+e+ache+f%E1cil&SInstru%E7%E3o_da_m%E3e=TODAS_AS_CATEGORIAS__&SEstado_civil_m%E3e=TODAS_AS_CATEGORIAS__&SDura%E7%E3o_gesta%E7%E3o=TODAS_AS_CATEGORIAS__&STipo_de_gravidez=TODAS_AS_CATEGORIAS__&pesqmes20=Digite+o+texto+e+ache+f%E1cil&SGrupos_de_Robson=TODAS_AS_CATEGORIAS__&SAdeq_quant_pr%E9-natal*=TODAS_AS_CATEGORIAS__&STipo_de_parto=TODAS_AS_CATEGORIAS__&SConsult_pr%E9-natal=TODAS_AS_CATEGORIAS__&SSexo=TODAS_AS_CATEGORIAS__&SCor%2Fra%E7a=TODAS_AS_CATEGORIAS__&SApgar_1%BA_minuto=TODAS_AS_CATEGORIAS__&SApgar_5%BA_minuto=TODAS_AS_CATEGORIAS__&SPeso_ao_nascer=TODAS_AS_CATEGORIAS__&SAnomalia_cong%EAnita=TODAS_AS_CATEGORIAS__&pesqmes30=Digite+o+texto+e+ache+f%E1cil&STipo_anomal_cong%EAn=TODAS_AS_CATEGORIAS__&formato=table&mostre=Mostra";

const SIOPS_FORM: &str = "Linha=Munic-BR&Coluna=Ano&Incremento={increment}&Arquivos=indmun{yy}.dbf&SUF=TODAS_AS_CATEGORIAS__&SCapitais=TODAS_AS_CATEGORIAS__&SMunic-BR=TODAS_AS_CATEGORIAS__&SRegi%E3o=TODAS_AS_CATEGORIAS__&SSele%E7%E3o_Capitais=TODAS_AS_CATEGORIAS__&SFaixa_Pop=TODAS_AS_CATEGORIAS__&formato=table&mostre=Mostra";

const BIRTHS_TABLE: TableContract = TableContract {
    measure: "births",
    selector: "table.tabdados",
    headers: &["Município", "Nascim p/resid.mãe"],
};

const SPENDING_TABLE: TableContract = TableContract {
    measure: "spending",
    selector: "table",
    headers: &["Munic-BR", "{year}", "Total"],
};

const POPULATION_TABLE: TableContract = TableContract {
    measure: "population",
    selector: "table",
    headers: &["Munic-BR", "{year}", "Total"],
};

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Births, Measure::Spending, Measure::Population];

    pub fn name(self) -> &'static str {
        self.contract().measure
    }

    pub fn contract(self) -> &'static TableContract {
        match self {
            Measure::Births => &BIRTHS_TABLE,
            Measure::Spending => &SPENDING_TABLE,
            Measure::Population => &POPULATION_TABLE,
        }
    }

    pub fn endpoint(self, cfg: &FetchConfig) -> &str {
        match self {
            Measure::Births => &cfg.sinasc_url,
            Measure::Spending | Measure::Population => &cfg.siops_url,
        }
    }

    /// Urlencoded POST body. The year goes into `Arquivos` as its last two digits.
    pub fn form_body(self, year: i32) -> String {
        let yy = format!("{:02}", year.rem_euclid(100));
        match self {
            Measure::Births => SINASC_FORM.replace("{yy}", &yy),
            Measure::Spending => SIOPS_FORM
                .replace("{increment}", "2.1_D.Total_Sa%FAde%2FHab")
                .replace("{yy}", &yy),
            Measure::Population => SIOPS_FORM
                .replace("{increment}", "Popula%E7%E3o")
                .replace("{yy}", &yy),
        }
    }
}
